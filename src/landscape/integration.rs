// Copyright (c) 2025 - Cowboy AI, Inc.
//! Integration phase

use std::sync::Arc;
use tracing::{debug, info, info_span};

use super::{ActivationParams, Landscape};
use crate::coupling::{
    CoordinatorContext, EnvironmentConstraints, IntegrationRegistrar, Participation,
};
use crate::errors::{LandscapeError, LandscapeResult};
use crate::state_machine::PhaseCommand;

impl Landscape {
    /// Attach couplings in precedence order and create their coordinators
    ///
    /// Completes the configuration phase first if needed.
    pub fn activate_integration(&self, params: &ActivationParams) -> LandscapeResult<()> {
        self.activate_configuration()?;

        let inner = &self.inner;
        inner.integration_gate.run(|| {
            let span = info_span!("integration", landscape = %inner.id);
            let _entered = span.enter();
            debug!(?params, "activating integration");

            let (configuration, credentials, devices) = {
                let mut tables = inner.tables.lock();
                tables.advance(PhaseCommand::BeginIntegration)?;
                let configuration = tables.configuration.clone().ok_or_else(|| {
                    LandscapeError::Semantic("integration without a loaded configuration".into())
                })?;
                (configuration, Arc::clone(&tables.credentials), tables.devices.clone())
            };

            let constraints = EnvironmentConstraints {
                configuration: &configuration,
                devices: &devices,
            };

            let mut registrar = IntegrationRegistrar::default();
            let mut participating = Vec::new();
            for coupling in inner.couplings.by_precedence() {
                coupling.attach_to_framework(&mut registrar)?;
                match coupling.attach_to_environment(&constraints)? {
                    Participation::Participating => {
                        info!(coupling = %coupling.key(), precedence = ?coupling.declare_precedence(), "coupling participating");
                        participating.push(coupling);
                    }
                    Participation::NotParticipating => {
                        debug!(coupling = %coupling.key(), "coupling not participating");
                    }
                }
            }

            let resolver = self.directory();
            for coupling in &participating {
                let ctx = CoordinatorContext {
                    key: coupling.key(),
                    registry: &inner.coordinators,
                    resolver: Arc::clone(&resolver),
                    devices: &devices,
                    configuration: Arc::clone(&configuration),
                    credentials: Arc::clone(&credentials),
                    probe: Arc::clone(&inner.probe),
                    agents: inner.agents.clone(),
                    aspects: inner.settings.presence_aspects.clone(),
                };
                coupling.create_coordinator(&ctx)?;
            }

            let coordinators = inner.coordinators.len();
            let mut tables = inner.tables.lock();
            tables.participating = participating;
            tables.integration_points = registrar.into_points();
            tables.advance(PhaseCommand::CompleteIntegration)?;

            info!(
                participating = tables.participating.len(),
                coordinators,
                "🔗 landscape integrated"
            );
            Ok(())
        })
    }
}
