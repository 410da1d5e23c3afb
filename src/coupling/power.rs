// Copyright (c) 2025 - Cowboy AI, Inc.
//! DLI power coupling: `power:powerType:DliPowerSwitch`

use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};
use tracing::warn;

use super::{
    require_str, CoordinatorContext, EnvironmentConstraints, IntegrationCoupling,
    IntegrationRegistrar, Participation, Precedence, StartupLevel,
};
use crate::coordinator::power::DLI_POWER_TYPE;
use crate::coordinator::{Coordinator, PowerCoordinator};
use crate::domain::ProtocolFamily;
use crate::errors::{LandscapeError, LandscapeResult};
use crate::landscape::report::ConnectivityOutcome;

#[derive(Debug, Default)]
pub struct PowerCoupling {
    coordinator: OnceLock<Arc<PowerCoordinator>>,
}

impl PowerCoupling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn power_coordinator(&self) -> Option<Arc<PowerCoordinator>> {
        self.coordinator.get().cloned()
    }

    fn require_coordinator(&self) -> LandscapeResult<&Arc<PowerCoordinator>> {
        self.coordinator.get().ok_or_else(|| {
            LandscapeError::Semantic(format!("{} has no coordinator yet", self.key()))
        })
    }
}

impl IntegrationCoupling for PowerCoupling {
    fn section(&self) -> &str {
        "power"
    }

    fn leaf(&self) -> &str {
        "powerType"
    }

    fn class(&self) -> &str {
        DLI_POWER_TYPE
    }

    fn declare_precedence(&self) -> Precedence {
        StartupLevel::Power.into()
    }

    fn attach_to_framework(&self, registrar: &mut IntegrationRegistrar) -> LandscapeResult<()> {
        registrar.register(&self.key(), "power-control");
        Ok(())
    }

    fn attach_to_environment(
        &self,
        constraints: &EnvironmentConstraints<'_>,
    ) -> LandscapeResult<Participation> {
        let declared = constraints.declared_items(self.section(), self.leaf(), self.class());

        Ok(if declared > 0 {
            Participation::Participating
        } else {
            Participation::NotParticipating
        })
    }

    fn create_coordinator(&self, ctx: &CoordinatorContext<'_>) -> LandscapeResult<()> {
        let coordinator = ctx.registry.get_or_create::<PowerCoordinator>(ctx)?;
        self.coordinator.get_or_init(|| coordinator);
        Ok(())
    }

    fn coordinator(&self) -> Option<Arc<dyn Coordinator>> {
        self.coordinator
            .get()
            .map(|c| Arc::clone(c) as Arc<dyn Coordinator>)
    }

    fn establish_presence(&self) -> LandscapeResult<()> {
        self.require_coordinator()?.establish_presence()
    }

    fn establish_connectivity(&self, allow_missing: bool) -> LandscapeResult<ConnectivityOutcome> {
        let report = self.require_coordinator()?.core().report(Vec::new());
        if !allow_missing && !report.missing.is_empty() {
            warn!(missing = ?report.missing, "power outlets missing");
        }

        Ok(ConnectivityOutcome {
            protocol: ProtocolFamily::Power.as_str().to_string(),
            config_errors: Vec::new(),
            report,
        })
    }

    fn validate_item_configuration(&self, entry: &Map<String, Value>) -> (Vec<String>, Vec<String>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        require_str(entry, "name", "power switch", &mut errors);
        require_str(entry, "host", "power switch", &mut errors);

        if !entry.contains_key("model") {
            warnings.push("power switch should declare its 'model'".to_string());
        }
        if !entry.contains_key("credential") {
            warnings.push("power switch has no 'credential'".to_string());
        }

        (errors, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_item() {
        let coupling = PowerCoupling::new();

        let good = json!({"name": "pdu-1", "powerType": DLI_POWER_TYPE, "model": "DIN4",
                          "host": "10.0.0.7", "credential": "pdu-admin"});
        let (errors, warnings) = coupling.validate_item_configuration(good.as_object().unwrap());
        assert!(errors.is_empty());
        assert!(warnings.is_empty());

        let sparse = json!({"name": "pdu-2", "powerType": DLI_POWER_TYPE});
        let (errors, warnings) = coupling.validate_item_configuration(sparse.as_object().unwrap());
        assert_eq!(errors.len(), 1);
        assert_eq!(warnings.len(), 2);
    }
}
