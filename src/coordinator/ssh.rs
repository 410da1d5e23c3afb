// Copyright (c) 2025 - Cowboy AI, Inc.
//! SSH coordinator
//!
//! Manages every device whose `deviceType` is one of the classes served by
//! an SSH coupling. Location is `host:port`; `host` defaults to the device
//! identifier and `port` to 22.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Coordinator, CoordinatorCore};
use crate::aspects::Aspects;
use crate::coupling::CoordinatorContext;
use crate::domain::{CoordinatorId, DeviceExtension, LandscapeDevice, ProtocolFamily};
use crate::errors::{LandscapeError, LandscapeResult};
use crate::interfaces::{CommandAgentFactory, ConnectivityProbe};
use crate::landscape::report::{ConnectivityFailure, ConnectivityReport};

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Command run on every present device when an agent factory is installed
pub const CONNECTIVITY_COMMAND: &str = "echo connected";

pub struct SshCoordinator {
    core: CoordinatorCore,
    classes: Mutex<BTreeSet<String>>,
    probe: Arc<dyn ConnectivityProbe>,
    agents: Option<Arc<dyn CommandAgentFactory>>,
    aspects: Aspects,
}

impl SshCoordinator {
    /// `host:port` of a device entry
    pub fn location_of(device: &LandscapeDevice) -> String {
        let config = device.config();
        let host = config
            .get("host")
            .and_then(Value::as_str)
            .unwrap_or_else(|| device.identity().as_str());
        let port = config
            .get("port")
            .and_then(Value::as_u64)
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(DEFAULT_SSH_PORT);
        format!("{host}:{port}")
    }

    /// Device classes this coordinator manages
    pub fn classes(&self) -> Vec<String> {
        self.classes.lock().iter().cloned().collect()
    }

    /// Attach every device of `class`; a class already served is left alone
    ///
    /// Returns the number of devices attached.
    pub fn serve_class(&self, class: &str, devices: &[Arc<LandscapeDevice>]) -> usize {
        if !self.classes.lock().insert(class.to_string()) {
            return 0;
        }

        let mut attached = 0;
        for device in devices.iter().filter(|d| d.device_type() == class) {
            let location = Self::location_of(device);
            let configuration = device
                .config()
                .get("ssh")
                .cloned()
                .unwrap_or_else(|| json!({ "location": location }));
            self.core
                .attach(device, device.identity().as_str(), location, configuration);
            attached += 1;
        }
        attached
    }

    /// Open an agent session on every present device
    ///
    /// Devices that fail are taken back out of the found set so they
    /// reconcile as missing. Without an agent factory the presence probe is
    /// the whole check and nothing fails here.
    pub fn establish_connectivity(&self) -> Vec<ConnectivityFailure> {
        if self.agents.is_none() {
            return Vec::new();
        }

        let found = self.core.found();
        let mut failures = Vec::new();
        for (key, extension) in self.core.children() {
            if !found.contains(&key) {
                continue;
            }
            if let Err(reason) = self.verify_one(&key, &extension, CONNECTIVITY_COMMAND, None) {
                warn!(device = %key, location = extension.location(), %reason, "ssh session failed");
                self.core.forget_found(&key);
                failures.push(ConnectivityFailure {
                    device: key,
                    location: extension.location().to_string(),
                    reason,
                });
            }
        }
        failures
    }

    fn verify_one(
        &self,
        key: &str,
        extension: &DeviceExtension,
        cmd: &str,
        user: Option<&str>,
    ) -> Result<(), String> {
        let Some(agents) = &self.agents else {
            return self
                .probe
                .probe(extension.location(), self.aspects.inactivity_timeout)
                .map_err(|e| e.to_string());
        };

        let device = self
            .core
            .lookup_device_by_key(key)
            .ok_or_else(|| format!("device '{key}' is no longer in the landscape"))?;
        let session = agents
            .open_session(&device, extension, user)
            .map_err(|e| e.to_string())?;
        let output = session
            .run_cmd(cmd, &self.aspects)
            .map_err(|e| e.to_string())?;

        if self.aspects.accepts_status(output.status) {
            Ok(())
        } else {
            Err(format!(
                "'{cmd}' exited with status {}: {}",
                output.status,
                output.stderr.trim()
            ))
        }
    }
}

impl Coordinator for SshCoordinator {
    fn initialize(ctx: &CoordinatorContext<'_>) -> LandscapeResult<Self> {
        let coordinator = Self {
            core: CoordinatorCore::new(
                CoordinatorId::of::<Self>(ProtocolFamily::Ssh),
                Arc::clone(&ctx.resolver),
            ),
            classes: Mutex::new(BTreeSet::new()),
            probe: Arc::clone(&ctx.probe),
            agents: ctx.agents.clone(),
            aspects: ctx.aspects.clone(),
        };

        let devices = coordinator.serve_class(ctx.key.class(), ctx.devices);
        info!(class = ctx.key.class(), devices, "🔐 SSH coordinator initialized");
        Ok(coordinator)
    }

    fn core(&self) -> &CoordinatorCore {
        &self.core
    }

    fn establish_presence(&self) -> LandscapeResult<()> {
        for (key, extension) in self.core.children() {
            let location = extension.location();
            let reached = self.aspects.attempt(location, || {
                self.probe.probe(location, self.aspects.inactivity_timeout)
            });

            match reached {
                Ok(()) => {
                    debug!(device = %key, %location, "ssh device present");
                    self.core.record_found(key);
                }
                Err(err) => warn!(device = %key, %location, error = %err, "ssh device not reachable"),
            }
        }
        Ok(())
    }

    fn verify_connectivity(
        &self,
        cmd: &str,
        user: Option<&str>,
        raise_on_error: bool,
    ) -> LandscapeResult<Vec<ConnectivityFailure>> {
        let mut failures = Vec::new();

        for (key, extension) in self.core.children() {
            if let Err(reason) = self.verify_one(&key, &extension, cmd, user) {
                failures.push(ConnectivityFailure {
                    device: key,
                    location: extension.location().to_string(),
                    reason,
                });
            }
        }

        if raise_on_error && !failures.is_empty() {
            let mut report = ConnectivityReport::default();
            report.protocol_mut(ProtocolFamily::Ssh.as_str()).failures = failures.clone();
            return Err(LandscapeError::Connectivity {
                message: format!("{} ssh device(s) failed connectivity verification", failures.len()),
                report: Box::new(report),
            });
        }

        Ok(failures)
    }
}

impl std::fmt::Debug for SshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshCoordinator")
            .field("classes", &*self.classes.lock())
            .field("core", &self.core)
            .finish()
    }
}
