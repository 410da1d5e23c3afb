// Copyright (c) 2025 - Cowboy AI, Inc.
//! TCP serial coupling: `serial:serialType:network/tcpserial`

use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};
use tracing::warn;

use super::{
    require_str, CoordinatorContext, EnvironmentConstraints, IntegrationCoupling,
    IntegrationRegistrar, Participation, Precedence, StartupLevel,
};
use crate::coordinator::serial::TCP_SERIAL_TYPE;
use crate::coordinator::{Coordinator, SerialCoordinator};
use crate::domain::ProtocolFamily;
use crate::errors::{LandscapeError, LandscapeResult};
use crate::landscape::report::ConnectivityOutcome;

#[derive(Debug, Default)]
pub struct SerialCoupling {
    coordinator: OnceLock<Arc<SerialCoordinator>>,
}

impl SerialCoupling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serial_coordinator(&self) -> Option<Arc<SerialCoordinator>> {
        self.coordinator.get().cloned()
    }

    fn require_coordinator(&self) -> LandscapeResult<&Arc<SerialCoordinator>> {
        self.coordinator.get().ok_or_else(|| {
            LandscapeError::Semantic(format!("{} has no coordinator yet", self.key()))
        })
    }
}

impl IntegrationCoupling for SerialCoupling {
    fn section(&self) -> &str {
        "serial"
    }

    fn leaf(&self) -> &str {
        "serialType"
    }

    fn class(&self) -> &str {
        TCP_SERIAL_TYPE
    }

    fn declare_precedence(&self) -> Precedence {
        StartupLevel::Serial.into()
    }

    fn attach_to_framework(&self, registrar: &mut IntegrationRegistrar) -> LandscapeResult<()> {
        registrar.register(&self.key(), "serial-consoles");
        Ok(())
    }

    fn attach_to_environment(
        &self,
        constraints: &EnvironmentConstraints<'_>,
    ) -> LandscapeResult<Participation> {
        let supported = constraints.declared_items(self.section(), self.leaf(), self.class());

        Ok(if supported > 0 {
            Participation::Participating
        } else {
            Participation::NotParticipating
        })
    }

    fn create_coordinator(&self, ctx: &CoordinatorContext<'_>) -> LandscapeResult<()> {
        let coordinator = ctx.registry.get_or_create::<SerialCoordinator>(ctx)?;
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
            warn!(missing = ?report.missing, "serial ports missing");
        }

        Ok(ConnectivityOutcome {
            protocol: ProtocolFamily::Serial.as_str().to_string(),
            config_errors: Vec::new(),
            report,
        })
    }

    fn validate_item_configuration(&self, entry: &Map<String, Value>) -> (Vec<String>, Vec<String>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        require_str(entry, "name", "serial interface", &mut errors);
        require_str(entry, "host", "serial interface", &mut errors);

        match entry.get("ports") {
            None => warnings.push("serial interface 'network/tcpserial' should have a 'ports' table".to_string()),
            Some(Value::Object(ports)) => {
                for (attachment, port) in ports {
                    if !port.as_u64().is_some_and(|p| (1..=65535).contains(&p)) {
                        errors.push(format!("serial port '{attachment}' is not a TCP port: {port}"));
                    }
                }
            }
            Some(_) => errors.push("serial interface 'ports' must be an object".to_string()),
        }

        (errors, warnings)
    }
}
