// Copyright (c) 2025 - Cowboy AI, Inc.
//! DLI power switch coordinator
//!
//! Power switches are declared in the `power` section:
//!
//! ```json
//! { "name": "pdu-1", "powerType": "DliPowerSwitch", "model": "DIN4",
//!   "host": "10.0.0.7", "credential": "pdu-admin" }
//! ```
//!
//! A device entry with `"power": { "name": "pdu-1", "switch": 3 }` is
//! attached to outlet 3 of that switch.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Coordinator, CoordinatorCore};
use crate::aspects::Aspects;
use crate::config::{Credential, CredentialStore};
use crate::coupling::CoordinatorContext;
use crate::domain::{CoordinatorId, ProtocolFamily};
use crate::errors::{LandscapeError, LandscapeResult};
use crate::interfaces::ConnectivityProbe;

/// The only supported `powerType`
pub const DLI_POWER_TYPE: &str = "DliPowerSwitch";

/// Default port of the switch web interface
pub const DEFAULT_POWER_PORT: u16 = 80;

/// One outlet of a power switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PowerOutlet {
    pub switch_name: String,
    pub model: Option<String>,
    pub host: String,
    pub port: u16,
    pub outlet: String,
    #[serde(skip)]
    pub credential: Option<Credential>,
}

impl PowerOutlet {
    pub fn location(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
struct PowerSwitch {
    model: Option<String>,
    host: String,
    port: u16,
    credential: Option<String>,
}

pub struct PowerCoordinator {
    core: CoordinatorCore,
    switches: BTreeMap<String, PowerSwitch>,
    credentials: Arc<CredentialStore>,
    probe: Arc<dyn ConnectivityProbe>,
    aspects: Aspects,
}

impl PowerCoordinator {
    fn load_switches(section: &[Value]) -> LandscapeResult<BTreeMap<String, PowerSwitch>> {
        let mut switches = BTreeMap::new();

        for item in section.iter().filter_map(Value::as_object) {
            if item.get("skip").and_then(Value::as_bool).unwrap_or(false) {
                continue;
            }

            let text = |field: &str| item.get(field).and_then(Value::as_str).map(str::to_string);

            let name = text("name").ok_or_else(|| {
                LandscapeError::Configuration("power switch without a 'name'".into())
            })?;

            let power_type = text("powerType").unwrap_or_default();
            if power_type != DLI_POWER_TYPE {
                return Err(LandscapeError::Configuration(format!(
                    "invalid powerType '{power_type}' for power switch '{name}'"
                )));
            }

            let host = text("host").ok_or_else(|| {
                LandscapeError::Configuration(format!("power switch '{name}' has no 'host'"))
            })?;
            let port = item
                .get("port")
                .and_then(Value::as_u64)
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(DEFAULT_POWER_PORT);

            switches.insert(
                name,
                PowerSwitch {
                    model: text("model"),
                    host,
                    port,
                    credential: text("credential"),
                },
            );
        }

        Ok(switches)
    }

    /// Resolve a `{name, switch}` power mapping to an outlet
    pub fn lookup_agent(&self, mapping: &Map<String, Value>) -> LandscapeResult<PowerOutlet> {
        let name = mapping
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| LandscapeError::Configuration("power mapping without 'name'".into()))?;
        let outlet = match mapping.get("switch") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(LandscapeError::Configuration(format!(
                    "power mapping for '{name}' without 'switch'"
                )))
            }
        };

        let switch = self.switches.get(name).ok_or_else(|| {
            LandscapeError::Configuration(format!("failure to lookup power switch '{name}'"))
        })?;
        let credential = switch
            .credential
            .as_deref()
            .map(|c| self.credentials.require(c).cloned())
            .transpose()?;

        Ok(PowerOutlet {
            switch_name: name.to_string(),
            model: switch.model.clone(),
            host: switch.host.clone(),
            port: switch.port,
            outlet,
            credential,
        })
    }

    pub fn switch_names(&self) -> Vec<String> {
        self.switches.keys().cloned().collect()
    }
}

impl Coordinator for PowerCoordinator {
    fn initialize(ctx: &CoordinatorContext<'_>) -> LandscapeResult<Self> {
        let coordinator = Self {
            core: CoordinatorCore::new(
                CoordinatorId::of::<Self>(ProtocolFamily::Power),
                Arc::clone(&ctx.resolver),
            ),
            switches: Self::load_switches(ctx.configuration.section(ctx.key.section()))?,
            credentials: Arc::clone(&ctx.credentials),
            probe: Arc::clone(&ctx.probe),
            aspects: ctx.aspects.clone(),
        };

        for device in ctx.devices {
            let Some(mapping) = device.config().get("power").and_then(Value::as_object) else {
                continue;
            };
            let outlet = coordinator.lookup_agent(mapping)?;
            coordinator.core.attach(
                device,
                device.identity().as_str(),
                outlet.location(),
                Value::Object(mapping.clone()),
            );
        }

        info!(
            switches = coordinator.switches.len(),
            devices = coordinator.core.expected().len(),
            "⚡ power coordinator initialized"
        );
        Ok(coordinator)
    }

    fn core(&self) -> &CoordinatorCore {
        &self.core
    }

    fn establish_presence(&self) -> LandscapeResult<()> {
        // Outlets share a switch, so probe each location once.
        let mut reachable: BTreeMap<String, bool> = BTreeMap::new();

        for (key, extension) in self.core.children() {
            let location = extension.location().to_string();
            let up = *reachable.entry(location.clone()).or_insert_with(|| {
                self.aspects
                    .attempt(&location, || {
                        self.probe.probe(&location, self.aspects.inactivity_timeout)
                    })
                    .map_err(|err| warn!(%location, error = %err, "power switch not reachable"))
                    .is_ok()
            });

            if up {
                debug!(device = %key, %location, "power outlet reachable");
                self.core.record_found(key);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for PowerCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerCoordinator")
            .field("switches", &self.switches)
            .field("core", &self.core)
            .finish()
    }
}
