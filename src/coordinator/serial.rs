// Copyright (c) 2025 - Cowboy AI, Inc.
//! TCP serial coordinator
//!
//! Serial interfaces are declared in the `serial` section:
//!
//! ```json
//! { "name": "ts-1", "serialType": "network/tcpserial",
//!   "host": "10.0.0.9", "ports": { "1": 7001, "2": 7002 } }
//! ```
//!
//! A device entry with `"serial": { "name": "ts-1", "port": "2" }` is
//! attached to port 7002 of `10.0.0.9`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Coordinator, CoordinatorCore};
use crate::aspects::Aspects;
use crate::coupling::CoordinatorContext;
use crate::domain::{CoordinatorId, ProtocolFamily};
use crate::errors::{LandscapeError, LandscapeResult};
use crate::interfaces::ConnectivityProbe;

/// The only supported `serialType`
pub const TCP_SERIAL_TYPE: &str = "network/tcpserial";

/// A TCP port of a serial concentrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpSerialEndpoint {
    pub interface: String,
    pub attachment: String,
    pub host: String,
    pub port: u16,
}

impl TcpSerialEndpoint {
    pub fn location(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
struct SerialInterface {
    host: String,
    ports: BTreeMap<String, u16>,
}

/// Render a mapping key or port value as text
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub struct SerialCoordinator {
    core: CoordinatorCore,
    interfaces: BTreeMap<String, SerialInterface>,
    probe: Arc<dyn ConnectivityProbe>,
    aspects: Aspects,
}

impl SerialCoordinator {
    fn load_interfaces(section: &[Value]) -> LandscapeResult<BTreeMap<String, SerialInterface>> {
        let mut interfaces = BTreeMap::new();

        for item in section.iter().filter_map(Value::as_object) {
            if item.get("skip").and_then(Value::as_bool).unwrap_or(false) {
                continue;
            }

            let name = item
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| LandscapeError::Configuration("serial interface without a 'name'".into()))?;

            let serial_type = item.get("serialType").and_then(Value::as_str).unwrap_or_default();
            if serial_type != TCP_SERIAL_TYPE {
                return Err(LandscapeError::Configuration(format!(
                    "invalid serialType '{serial_type}' for serial interface '{name}'"
                )));
            }

            let host = item
                .get("host")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    LandscapeError::Configuration(format!("serial interface '{name}' has no 'host'"))
                })?
                .to_string();

            let mut ports = BTreeMap::new();
            for (attachment, port) in item.get("ports").and_then(Value::as_object).into_iter().flatten() {
                let port = port
                    .as_u64()
                    .and_then(|p| u16::try_from(p).ok())
                    .ok_or_else(|| {
                        LandscapeError::Configuration(format!(
                            "serial interface '{name}' port '{attachment}' is not a TCP port"
                        ))
                    })?;
                ports.insert(attachment.clone(), port);
            }

            interfaces.insert(name.to_string(), SerialInterface { host, ports });
        }

        Ok(interfaces)
    }

    /// Resolve a `{name, port}` serial mapping to its TCP endpoint
    pub fn lookup_agent(&self, mapping: &Map<String, Value>) -> LandscapeResult<TcpSerialEndpoint> {
        let name = mapping
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| LandscapeError::Configuration("serial mapping without 'name'".into()))?;
        let attachment = mapping
            .get("port")
            .and_then(text_of)
            .ok_or_else(|| LandscapeError::Configuration("serial mapping without 'port'".into()))?;

        let interface = self.interfaces.get(name).ok_or_else(|| {
            LandscapeError::Configuration(format!("failure to lookup serial interface '{name}'"))
        })?;
        let port = interface.ports.get(&attachment).copied().ok_or_else(|| {
            LandscapeError::Configuration(format!(
                "serial interface '{name}' has no port '{attachment}'"
            ))
        })?;

        Ok(TcpSerialEndpoint {
            interface: name.to_string(),
            attachment,
            host: interface.host.clone(),
            port,
        })
    }

    pub fn interface_names(&self) -> Vec<String> {
        self.interfaces.keys().cloned().collect()
    }
}

impl Coordinator for SerialCoordinator {
    fn initialize(ctx: &CoordinatorContext<'_>) -> LandscapeResult<Self> {
        let coordinator = Self {
            core: CoordinatorCore::new(
                CoordinatorId::of::<Self>(ProtocolFamily::Serial),
                Arc::clone(&ctx.resolver),
            ),
            interfaces: Self::load_interfaces(ctx.configuration.section(ctx.key.section()))?,
            probe: Arc::clone(&ctx.probe),
            aspects: ctx.aspects.clone(),
        };

        for device in ctx.devices {
            let Some(mapping) = device.config().get("serial").and_then(Value::as_object) else {
                continue;
            };
            let endpoint = coordinator.lookup_agent(mapping)?;
            coordinator.core.attach(
                device,
                device.identity().as_str(),
                endpoint.location(),
                Value::Object(mapping.clone()),
            );
        }

        info!(
            interfaces = coordinator.interfaces.len(),
            devices = coordinator.core.expected().len(),
            "🔌 serial coordinator initialized"
        );
        Ok(coordinator)
    }

    fn core(&self) -> &CoordinatorCore {
        &self.core
    }

    fn establish_presence(&self) -> LandscapeResult<()> {
        for (key, extension) in self.core.children() {
            let location = extension.location();
            match self.aspects.attempt(location, || {
                self.probe.probe(location, self.aspects.inactivity_timeout)
            }) {
                Ok(()) => {
                    debug!(device = %key, %location, "serial port reachable");
                    self.core.record_found(key);
                }
                Err(err) => warn!(device = %key, %location, error = %err, "serial port not reachable"),
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for SerialCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialCoordinator")
            .field("interfaces", &self.interfaces)
            .field("core", &self.core)
            .finish()
    }
}
