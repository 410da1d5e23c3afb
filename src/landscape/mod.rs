// Copyright (c) 2025 - Cowboy AI, Inc.
//! The Landscape
//!
//! A [`Landscape`] is stood up in three gated phases:
//!
//! ```text
//!  activate_configuration     activate_integration        activate_operations
//! ┌────────────────────────┐ ┌─────────────────────────┐ ┌──────────────────────────┐
//! │ load documents         │ │ attach_to_framework     │ │ establish_presence       │
//! │ validate sections      │─▶ attach_to_environment   │─▶ establish_connectivity   │
//! │ credentials            │ │ create_coordinator      │ │ reconcile, features,     │
//! │ device table           │ │ (precedence order)      │ │ topology                 │
//! └────────────────────────┘ └─────────────────────────┘ └──────────────────────────┘
//!      Configured                  Integrated                  Operational
//! ```
//!
//! Each phase runs once. Later phases run the earlier ones first, so any
//! entry point leaves the landscape in a consistent phase. The landscape lock
//! protects the in-memory tables only; loads, probes and file writes happen
//! with it released.
//!
//! There is one process-wide landscape ([`Landscape::singleton`]). Tests use
//! [`LandscapeBuilder`] for isolated instances.

mod configuration;
mod integration;
mod operational;
pub mod params;
pub mod report;

pub use params::ActivationParams;
pub use report::{ConnectivityFailure, ConnectivityOutcome, ConnectivityReport, ProtocolReport};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{
    ConfigurationSource, CredentialStore, LandscapeConfiguration, LandscapeSettings,
};
use crate::coordinator::{Coordinator, CoordinatorRegistry};
use crate::coupling::{CouplingKey, CouplingRegistry, ExtensionPoints, IntegrationCoupling, IntegrationPoint};
use crate::domain::{
    select_device_configs, select_devices, ConfigIncludeFilter, DeviceExtension, DeviceRef,
    ExcludeFilter, FriendlyIdentifier, IncludeFilter, LandscapeDevice, ProtocolFamily,
};
use crate::errors::{LandscapeError, LandscapeResult};
use crate::gate::PhaseGate;
use crate::interfaces::{CommandAgentFactory, ConnectivityProbe, DeviceResolver, TcpProbe};
use crate::state_machine::{LandscapePhase, PhaseCommand, StateMachineWithHistory, Transition};

/// A device reservation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRecord {
    pub reservation: Uuid,
    pub device: FriendlyIdentifier,
    pub checked_out_at: DateTime<Utc>,
}

/// Tables guarded by the landscape lock
struct LandscapeTables {
    phase: StateMachineWithHistory<LandscapePhase>,
    configuration: Option<Arc<LandscapeConfiguration>>,
    credentials: Arc<CredentialStore>,
    devices: Vec<Arc<LandscapeDevice>>,
    device_configs: Vec<Map<String, Value>>,
    unrecognized: Vec<Map<String, Value>>,
    participating: Vec<Arc<dyn IntegrationCoupling>>,
    integration_points: Vec<IntegrationPoint>,
    report: Option<ConnectivityReport>,
    checkouts: BTreeMap<String, CheckoutRecord>,
}

impl LandscapeTables {
    fn new() -> Self {
        Self {
            phase: StateMachineWithHistory::new(LandscapePhase::Unconfigured),
            configuration: None,
            credentials: Arc::new(CredentialStore::default()),
            devices: Vec::new(),
            device_configs: Vec::new(),
            unrecognized: Vec::new(),
            participating: Vec::new(),
            integration_points: Vec::new(),
            report: None,
            checkouts: BTreeMap::new(),
        }
    }

    fn phase(&self) -> LandscapePhase {
        *self.phase.current_state()
    }

    fn advance(&mut self, command: PhaseCommand) -> LandscapeResult<()> {
        let from = self.phase();
        self.phase.transition_with_history(command, Utc::now())?;
        debug!(%from, to = %self.phase(), ?command, "landscape phase transition");
        Ok(())
    }

    fn require_configured(&self, what: &str) -> LandscapeResult<()> {
        if self.phase().is_configured() {
            Ok(())
        } else {
            Err(LandscapeError::Semantic(format!(
                "{what} requires a configured landscape (phase is {})",
                self.phase()
            )))
        }
    }

    fn require_operational(&self, what: &str) -> LandscapeResult<()> {
        if self.phase().is_operational() {
            Ok(())
        } else {
            Err(LandscapeError::Semantic(format!(
                "{what} requires an operational landscape (phase is {})",
                self.phase()
            )))
        }
    }

    fn device(&self, identifier: &str) -> Option<&Arc<LandscapeDevice>> {
        self.devices
            .iter()
            .find(|d| d.identity().as_str() == identifier)
    }

    /// Reserve every listed device or none of them
    fn checkout_all(&mut self, identifiers: &[String]) -> LandscapeResult<Vec<CheckoutRecord>> {
        self.require_operational("checkout")?;

        let mut requested: Vec<&str> = Vec::with_capacity(identifiers.len());
        for id in identifiers {
            if self.device(id).is_none() {
                return Err(LandscapeError::Checkout(format!("unknown device '{id}'")));
            }
            if self.checkouts.contains_key(id.as_str()) {
                return Err(LandscapeError::Checkout(format!(
                    "device '{id}' is already checked out"
                )));
            }
            if requested.contains(&id.as_str()) {
                return Err(LandscapeError::Checkout(format!(
                    "device '{id}' requested twice"
                )));
            }
            requested.push(id);
        }

        let now = Utc::now();
        let mut records = Vec::with_capacity(requested.len());
        for id in requested {
            let Some(device) = self.device(id) else {
                continue;
            };
            let record = CheckoutRecord {
                reservation: Uuid::now_v7(),
                device: device.identity().clone(),
                checked_out_at: now,
            };
            self.checkouts.insert(id.to_string(), record.clone());
            records.push(record);
        }
        Ok(records)
    }

    /// Return every listed device or none of them
    fn checkin_all(&mut self, identifiers: &[String]) -> LandscapeResult<Vec<CheckoutRecord>> {
        self.require_operational("checkin")?;

        for id in identifiers {
            if !self.checkouts.contains_key(id.as_str()) {
                return Err(LandscapeError::Checkin(format!(
                    "device '{id}' is not checked out"
                )));
            }
        }

        Ok(identifiers
            .iter()
            .filter_map(|id| self.checkouts.remove(id.as_str()))
            .collect())
    }
}

pub(crate) struct LandscapeInner {
    id: Uuid,
    settings: LandscapeSettings,
    source: Box<dyn ConfigurationSource>,
    couplings: CouplingRegistry,
    coordinators: CoordinatorRegistry,
    probe: Arc<dyn ConnectivityProbe>,
    agents: Option<Arc<dyn CommandAgentFactory>>,
    configuration_gate: PhaseGate,
    integration_gate: PhaseGate,
    operations_gate: PhaseGate,
    tables: Mutex<LandscapeTables>,
}

/// Resolves device handles against the landscape device table
struct LandscapeDirectory {
    inner: Weak<LandscapeInner>,
}

impl DeviceResolver for LandscapeDirectory {
    fn resolve(&self, device: &DeviceRef) -> Option<Arc<LandscapeDevice>> {
        let inner = self.inner.upgrade()?;
        let tables = inner.tables.lock();
        tables.device(device.identity().as_str()).cloned()
    }
}

/// Builds isolated landscapes
pub struct LandscapeBuilder {
    settings: LandscapeSettings,
    source: Option<Box<dyn ConfigurationSource>>,
    extension_points: ExtensionPoints,
    probe: Arc<dyn ConnectivityProbe>,
    agents: Option<Arc<dyn CommandAgentFactory>>,
}

impl Default for LandscapeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LandscapeBuilder {
    /// Default settings, builtin couplings, TCP probe
    pub fn new() -> Self {
        Self {
            settings: LandscapeSettings::default(),
            source: None,
            extension_points: ExtensionPoints::builtin(),
            probe: Arc::new(TcpProbe),
            agents: None,
        }
    }

    /// Settings read from the environment
    pub fn from_env() -> Self {
        Self::new().with_settings(LandscapeSettings::from_env())
    }

    pub fn with_settings(mut self, settings: LandscapeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use `source` instead of the files named in the settings
    pub fn with_source(mut self, source: impl ConfigurationSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_extension_points(mut self, extension_points: ExtensionPoints) -> Self {
        self.extension_points = extension_points;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_agent_factory(mut self, agents: Arc<dyn CommandAgentFactory>) -> Self {
        self.agents = Some(agents);
        self
    }

    pub fn build(self) -> LandscapeResult<Landscape> {
        let couplings = self.extension_points.resolve()?;
        let source = match self.source {
            Some(source) => source,
            None => Box::new(self.settings.file_source()),
        };

        let inner = LandscapeInner {
            id: Uuid::now_v7(),
            settings: self.settings,
            source,
            couplings,
            coordinators: CoordinatorRegistry::new(),
            probe: self.probe,
            agents: self.agents,
            configuration_gate: PhaseGate::new("configuration"),
            integration_gate: PhaseGate::new("integration"),
            operations_gate: PhaseGate::new("operations"),
            tables: Mutex::new(LandscapeTables::new()),
        };

        info!(
            landscape = %inner.id,
            couplings = inner.couplings.len(),
            "🗺️ landscape created"
        );
        Ok(Landscape {
            inner: Arc::new(inner),
        })
    }
}

static LANDSCAPE: OnceLock<Landscape> = OnceLock::new();
static LANDSCAPE_BUILD: Mutex<()> = Mutex::new(());

/// Value of `cell`, building it under `guard` if unset
///
/// Only one caller runs `build`; the others wait and read its result. A
/// failed build leaves the cell unset.
fn get_or_build<T: Clone>(
    cell: &OnceLock<T>,
    guard: &Mutex<()>,
    build: impl FnOnce() -> LandscapeResult<T>,
) -> LandscapeResult<T> {
    if let Some(existing) = cell.get() {
        return Ok(existing.clone());
    }

    let _building = guard.lock();
    if let Some(existing) = cell.get() {
        return Ok(existing.clone());
    }
    let built = build()?;
    Ok(cell.get_or_init(|| built).clone())
}

/// Handle to a landscape; clones share the same landscape
#[derive(Clone)]
pub struct Landscape {
    inner: Arc<LandscapeInner>,
}

impl Landscape {
    pub fn builder() -> LandscapeBuilder {
        LandscapeBuilder::new()
    }

    /// The process-wide landscape, built from the environment on first use
    pub fn singleton() -> LandscapeResult<Landscape> {
        get_or_build(&LANDSCAPE, &LANDSCAPE_BUILD, || LandscapeBuilder::from_env().build())
    }

    /// Install the process-wide landscape from a builder
    pub fn initialize_singleton(builder: LandscapeBuilder) -> LandscapeResult<Landscape> {
        let _building = LANDSCAPE_BUILD.lock();
        if LANDSCAPE.get().is_some() {
            return Err(LandscapeError::Semantic("landscape singleton is already initialized".into()));
        }
        let landscape = builder.build()?;
        LANDSCAPE
            .set(landscape.clone())
            .map_err(|_| LandscapeError::Semantic("landscape singleton is already initialized".into()))?;
        Ok(landscape)
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn settings(&self) -> &LandscapeSettings {
        &self.inner.settings
    }

    pub fn phase(&self) -> LandscapePhase {
        self.inner.tables.lock().phase()
    }

    pub fn phase_history(&self) -> Vec<Transition<LandscapePhase, PhaseCommand>> {
        self.inner.tables.lock().phase.get_history().to_vec()
    }

    /// Keys of every installed coupling
    pub fn installed_couplings(&self) -> Vec<String> {
        self.inner.couplings.keys()
    }

    pub fn coupling(&self, key: &str) -> Option<Arc<dyn IntegrationCoupling>> {
        self.inner.couplings.get(key)
    }

    /// Couplings that took part in integration, in activation order
    pub fn participating_couplings(&self) -> Vec<CouplingKey> {
        self.inner
            .tables
            .lock()
            .participating
            .iter()
            .map(|c| c.key())
            .collect()
    }

    pub fn integration_points(&self) -> Vec<IntegrationPoint> {
        self.inner.tables.lock().integration_points.clone()
    }

    pub fn coordinators(&self) -> &CoordinatorRegistry {
        &self.inner.coordinators
    }

    pub fn coordinator<C: Coordinator>(&self) -> Option<Arc<C>> {
        self.inner.coordinators.get::<C>()
    }

    pub fn get_devices(&self) -> LandscapeResult<Vec<Arc<LandscapeDevice>>> {
        let tables = self.inner.tables.lock();
        tables.require_configured("get_devices")?;
        Ok(tables.devices.clone())
    }

    pub fn get_devices_with_filters(
        &self,
        includes: &[&dyn IncludeFilter],
        excludes: &[&dyn ExcludeFilter],
    ) -> LandscapeResult<Vec<Arc<LandscapeDevice>>> {
        let tables = self.inner.tables.lock();
        tables.require_configured("get_devices_with_filters")?;
        Ok(select_devices(&tables.devices, includes, excludes))
    }

    /// Declared device entries, skipped entries excluded
    pub fn get_device_configs(&self) -> LandscapeResult<Vec<Map<String, Value>>> {
        let tables = self.inner.tables.lock();
        tables.require_configured("get_device_configs")?;
        Ok(tables.device_configs.clone())
    }

    pub fn get_device_configs_with_filters(
        &self,
        includes: &[&dyn ConfigIncludeFilter],
    ) -> LandscapeResult<Vec<Map<String, Value>>> {
        let tables = self.inner.tables.lock();
        tables.require_configured("get_device_configs_with_filters")?;
        Ok(select_device_configs(&tables.device_configs, includes))
    }

    /// Device entries no installed coupling claimed
    pub fn unrecognized_device_configs(&self) -> LandscapeResult<Vec<Map<String, Value>>> {
        let tables = self.inner.tables.lock();
        tables.require_configured("unrecognized_device_configs")?;
        Ok(tables.unrecognized.clone())
    }

    pub fn lookup_device(&self, identifier: &str) -> LandscapeResult<Option<Arc<LandscapeDevice>>> {
        let tables = self.inner.tables.lock();
        tables.require_configured("lookup_device")?;
        Ok(tables.device(identifier).cloned())
    }

    /// Extension a device has for `protocol`
    pub fn lookup_extension(
        &self,
        identifier: &str,
        protocol: ProtocolFamily,
    ) -> LandscapeResult<Option<Arc<DeviceExtension>>> {
        let extension_ref = {
            let tables = self.inner.tables.lock();
            tables.require_configured("lookup_extension")?;
            tables.device(identifier).and_then(|d| d.extension(protocol))
        };

        Ok(extension_ref.and_then(|r| {
            self.inner
                .coordinators
                .get_by_id(&r.coordinator)
                .and_then(|c| c.core().child(&r.ext_id))
        }))
    }

    /// Replace a device record with an enhanced one of the same identity
    ///
    /// Extension references move to the new record and every extension is
    /// re-pointed at it.
    pub fn upgrade_device(&self, device: LandscapeDevice) -> LandscapeResult<Arc<LandscapeDevice>> {
        let device = Arc::new(device);
        {
            let mut tables = self.inner.tables.lock();
            tables.require_configured("upgrade_device")?;
            let slot = tables
                .devices
                .iter()
                .position(|d| d.identity() == device.identity())
                .ok_or_else(|| {
                    LandscapeError::Semantic(format!(
                        "cannot upgrade unknown device '{}'",
                        device.identity()
                    ))
                })?;
            device.adopt_extensions(&tables.devices[slot]);
            tables.devices[slot] = Arc::clone(&device);
        }

        for extension_ref in device.extensions().into_values() {
            if let Some(extension) = self
                .inner
                .coordinators
                .get_by_id(&extension_ref.coordinator)
                .and_then(|c| c.core().child(&extension_ref.ext_id))
            {
                extension.update_base_device_ref(device.device_ref());
            }
        }

        debug!(device = %device.identity(), "device record upgraded");
        Ok(device)
    }

    pub fn checkout_device(&self, identifier: &str) -> LandscapeResult<CheckoutRecord> {
        let mut records = self
            .inner
            .tables
            .lock()
            .checkout_all(&[identifier.to_string()])?;
        records
            .pop()
            .ok_or_else(|| LandscapeError::Checkout(format!("device '{identifier}' not reserved")))
    }

    /// Reserve all listed devices, or none if any is unavailable
    pub fn checkout_multiple_devices(&self, identifiers: &[&str]) -> LandscapeResult<Vec<CheckoutRecord>> {
        let identifiers: Vec<String> = identifiers.iter().map(|s| s.to_string()).collect();
        self.inner.tables.lock().checkout_all(&identifiers)
    }

    /// Reserve every device the filters select
    pub fn checkout_devices_with_filters(
        &self,
        includes: &[&dyn IncludeFilter],
        excludes: &[&dyn ExcludeFilter],
    ) -> LandscapeResult<Vec<CheckoutRecord>> {
        let mut tables = self.inner.tables.lock();
        let identifiers: Vec<String> = select_devices(&tables.devices, includes, excludes)
            .iter()
            .map(|d| d.identity().to_string())
            .collect();
        tables.checkout_all(&identifiers)
    }

    pub fn checkin_device(&self, identifier: &str) -> LandscapeResult<CheckoutRecord> {
        let mut records = self
            .inner
            .tables
            .lock()
            .checkin_all(&[identifier.to_string()])?;
        records
            .pop()
            .ok_or_else(|| LandscapeError::Checkin(format!("device '{identifier}' not returned")))
    }

    /// Return all listed devices, or none if any is not checked out
    pub fn checkin_multiple_devices(&self, identifiers: &[&str]) -> LandscapeResult<Vec<CheckoutRecord>> {
        let identifiers: Vec<String> = identifiers.iter().map(|s| s.to_string()).collect();
        self.inner.tables.lock().checkin_all(&identifiers)
    }

    pub fn checked_out_devices(&self) -> Vec<CheckoutRecord> {
        self.inner.tables.lock().checkouts.values().cloned().collect()
    }

    /// Run diagnostics on every installed coupling
    ///
    /// Every coupling runs even if an earlier one fails; the failures are
    /// returned.
    pub fn diagnostic(&self, label: &str, level: u32, folder: &Path) -> Vec<(CouplingKey, LandscapeError)> {
        self.inner
            .couplings
            .iter()
            .filter_map(|coupling| {
                coupling
                    .diagnostic(label, level, folder)
                    .err()
                    .map(|err| (coupling.key(), err))
            })
            .collect()
    }

    pub fn connectivity_report(&self) -> Option<ConnectivityReport> {
        self.inner.tables.lock().report.clone()
    }

    /// `pod.environment` of the declared landscape
    pub fn environment(&self) -> LandscapeResult<Map<String, Value>> {
        let tables = self.inner.tables.lock();
        tables.require_configured("environment")?;
        Ok(tables
            .configuration
            .as_ref()
            .map(|c| c.environment())
            .unwrap_or_default())
    }

    pub fn credentials(&self) -> Arc<CredentialStore> {
        Arc::clone(&self.inner.tables.lock().credentials)
    }

    pub fn configuration(&self) -> Option<Arc<LandscapeConfiguration>> {
        self.inner.tables.lock().configuration.clone()
    }

    fn directory(&self) -> Arc<dyn DeviceResolver> {
        Arc::new(LandscapeDirectory {
            inner: Arc::downgrade(&self.inner),
        })
    }
}

impl std::fmt::Debug for Landscape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Landscape")
            .field("id", &self.inner.id)
            .field("phase", &self.inner.tables.try_lock().map(|t| t.phase()))
            .field("couplings", &self.inner.couplings)
            .finish()
    }
}

/// Stand up the process-wide landscape
pub fn startup_landscape(params: &ActivationParams) -> LandscapeResult<Landscape> {
    let landscape = Landscape::singleton()?;
    landscape.activate_operations(params)?;
    Ok(landscape)
}
