// Copyright (c) 2025 - Cowboy AI, Inc.
//! SSH coupling: `devices:deviceType:<class>`

use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, warn};

use super::{
    require_str, CoordinatorContext, EnvironmentConstraints, IntegrationCoupling,
    IntegrationRegistrar, Participation, Precedence, StartupLevel,
};
use crate::coordinator::{Coordinator, SshCoordinator};
use crate::domain::{LandscapeDevice, ProtocolFamily};
use crate::errors::{LandscapeError, LandscapeResult};
use crate::landscape::report::ConnectivityOutcome;

/// Default device class handled by the SSH coupling
pub const SSH_DEVICE_CLASS: &str = "ssh";

#[derive(Debug)]
pub struct SshCoupling {
    class: String,
    coordinator: OnceLock<Arc<SshCoordinator>>,
}

impl SshCoupling {
    pub fn new() -> Self {
        Self::with_class(SSH_DEVICE_CLASS)
    }

    /// Claim devices with a different `deviceType`
    pub fn with_class(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            coordinator: OnceLock::new(),
        }
    }

    pub fn ssh_coordinator(&self) -> Option<Arc<SshCoordinator>> {
        self.coordinator.get().cloned()
    }

    fn require_coordinator(&self) -> LandscapeResult<&Arc<SshCoordinator>> {
        self.coordinator.get().ok_or_else(|| {
            LandscapeError::Semantic(format!("{} has no coordinator yet", self.key()))
        })
    }
}

impl Default for SshCoupling {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegrationCoupling for SshCoupling {
    fn section(&self) -> &str {
        "devices"
    }

    fn leaf(&self) -> &str {
        "deviceType"
    }

    fn class(&self) -> &str {
        &self.class
    }

    fn declare_precedence(&self) -> Precedence {
        StartupLevel::PrimaryProtocol.into()
    }

    fn attach_to_framework(&self, registrar: &mut IntegrationRegistrar) -> LandscapeResult<()> {
        registrar.register(&self.key(), "ssh-sessions");
        Ok(())
    }

    fn attach_to_environment(
        &self,
        constraints: &EnvironmentConstraints<'_>,
    ) -> LandscapeResult<Participation> {
        let count = constraints.devices_of_type(&self.class);
        debug!(class = %self.class, devices = count, "ssh coupling attaching to environment");

        Ok(if count > 0 {
            Participation::Participating
        } else {
            Participation::NotParticipating
        })
    }

    fn create_coordinator(&self, ctx: &CoordinatorContext<'_>) -> LandscapeResult<()> {
        let coordinator = ctx.registry.get_or_create::<SshCoordinator>(ctx)?;
        let joined = coordinator.serve_class(&self.class, ctx.devices);
        if joined > 0 {
            debug!(class = %self.class, devices = joined, "ssh coordinator serving another class");
        }
        self.coordinator.get_or_init(|| coordinator);
        Ok(())
    }

    fn coordinator(&self) -> Option<Arc<dyn Coordinator>> {
        self.coordinator
            .get()
            .map(|c| Arc::clone(c) as Arc<dyn Coordinator>)
    }

    fn create_landscape_device(&self, entry: &Map<String, Value>) -> LandscapeResult<LandscapeDevice> {
        Ok(LandscapeDevice::from_config(self.class.clone(), entry.clone())?)
    }

    fn establish_presence(&self) -> LandscapeResult<()> {
        self.require_coordinator()?.establish_presence()
    }

    fn establish_connectivity(&self, allow_missing: bool) -> LandscapeResult<ConnectivityOutcome> {
        let coordinator = self.require_coordinator()?;
        let failures = coordinator.establish_connectivity();
        let report = coordinator.core().report(failures);

        for device in &report.missing {
            if allow_missing {
                warn!(%device, "ssh device missing");
            } else {
                error!(%device, "ssh device missing");
            }
        }

        Ok(ConnectivityOutcome {
            protocol: ProtocolFamily::Ssh.as_str().to_string(),
            config_errors: Vec::new(),
            report,
        })
    }

    fn validate_item_configuration(&self, entry: &Map<String, Value>) -> (Vec<String>, Vec<String>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if ["identifier", "name", "host"]
            .iter()
            .all(|f| !entry.contains_key(*f))
        {
            errors.push("ssh device must have an 'identifier', 'name' or 'host' field".to_string());
        }

        if entry.contains_key("host") {
            require_str(entry, "host", "ssh device", &mut errors);
        } else {
            warnings.push("ssh device has no 'host', the identifier is used".to_string());
        }

        match entry.get("port") {
            None => {}
            Some(port) if port.as_u64().is_some_and(|p| (1..=65535).contains(&p)) => {}
            Some(port) => errors.push(format!("ssh device 'port' is not a TCP port: {port}")),
        }

        (errors, warnings)
    }

    fn diagnostic(&self, label: &str, level: u32, folder: &Path) -> LandscapeResult<()> {
        let Some(coordinator) = self.coordinator.get() else {
            return Ok(());
        };
        let summary = serde_json::json!({
            "label": label,
            "level": level,
            "expected": coordinator.core().expected(),
            "found": coordinator.core().found(),
            "missing": coordinator.core().missing(),
        });
        std::fs::create_dir_all(folder)?;
        std::fs::write(
            folder.join("ssh-diagnostic.json"),
            serde_json::to_string_pretty(&summary)?,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn entry(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test_case(json!({"deviceType": "ssh", "identifier": "node-a"}), 0, 1 ; "identifier only")]
    #[test_case(json!({"deviceType": "ssh", "host": "10.0.0.1", "port": 2222}), 0, 0 ; "host and port")]
    #[test_case(json!({"deviceType": "ssh"}), 1, 1 ; "no identity")]
    #[test_case(json!({"deviceType": "ssh", "host": "", "port": 0}), 2, 0 ; "bad host and port")]
    fn test_validate_item(value: Value, errors: usize, warnings: usize) {
        let (e, w) = SshCoupling::new().validate_item_configuration(&entry(value));
        assert_eq!(e.len(), errors, "errors: {e:?}");
        assert_eq!(w.len(), warnings, "warnings: {w:?}");
    }

    #[test]
    fn test_key_uses_class() {
        assert_eq!(SshCoupling::new().key().to_string(), "devices:deviceType:ssh");
        assert_eq!(
            SshCoupling::with_class("SshClient").key().to_string(),
            "devices:deviceType:SshClient"
        );
    }

    #[test]
    fn test_create_landscape_device() {
        let device = SshCoupling::new()
            .create_landscape_device(&entry(json!({"deviceType": "ssh", "identifier": "node-a"})))
            .unwrap();
        assert_eq!(device.identity().as_str(), "node-a");
        assert_eq!(device.device_type(), "ssh");
    }

    #[test]
    fn test_connectivity_needs_coordinator() {
        let result = SshCoupling::new().establish_connectivity(false);
        assert!(matches!(result, Err(LandscapeError::Semantic(_))));
    }
}
