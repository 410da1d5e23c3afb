// Copyright (c) 2025 - Cowboy AI, Inc.
//! Integration Couplings
//!
//! An [`IntegrationCoupling`] claims one `(section, leaf, class)` triple of
//! the landscape document. For the `devices` section the triple reads
//! "entries whose `deviceType` is `ssh`"; for `serial` it reads "entries whose
//! `serialType` is `network/tcpserial`".
//!
//! During activation the landscape drives every installed coupling through
//! the same sequence, lowest precedence first:
//!
//! ```text
//! validate_item_configuration ─▶ create_landscape_device       (configuration)
//! attach_to_framework ─▶ attach_to_environment ─▶ create_coordinator (integration)
//! establish_presence ─▶ establish_connectivity                 (operations)
//! ```

pub mod power;
pub mod registry;
pub mod serial;
pub mod ssh;

pub use power::PowerCoupling;
pub use registry::{
    BuiltinCouplings, CouplingFactory, CouplingRegistry, ExtensionPoints, FnCouplingFactory,
};
pub use serial::SerialCoupling;
pub use ssh::SshCoupling;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::aspects::Aspects;
use crate::config::{CredentialStore, LandscapeConfiguration};
use crate::coordinator::{Coordinator, CoordinatorRegistry};
use crate::domain::LandscapeDevice;
use crate::errors::{LandscapeError, LandscapeResult};
use crate::interfaces::{CommandAgentFactory, ConnectivityProbe, DeviceResolver};
use crate::landscape::report::ConnectivityOutcome;

/// Composite coupling key, rendered `"{section}:{leaf}:{class}"`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CouplingKey {
    section: String,
    leaf: String,
    class: String,
}

impl CouplingKey {
    pub fn new(
        section: impl Into<String>,
        leaf: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into(),
            leaf: leaf.into(),
            class: class.into(),
        }
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn leaf(&self) -> &str {
        &self.leaf
    }

    pub fn class(&self) -> &str {
        &self.class
    }
}

impl fmt::Display for CouplingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.section, self.leaf, self.class)
    }
}

/// Well known startup levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StartupLevel {
    Power = 10000,
    Serial = 20000,
    SecondaryProtocol = 30000,
    PrimaryProtocol = 40000,
}

/// Activation order of a coupling, lower first
///
/// `Unordered` sorts after every declared level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Precedence {
    Ordered(u32),
    Unordered,
}

impl From<StartupLevel> for Precedence {
    fn from(level: StartupLevel) -> Self {
        Precedence::Ordered(level as u32)
    }
}

/// Stable sort by precedence; ties keep registration order
pub fn sort_by_precedence(couplings: &mut [Arc<dyn IntegrationCoupling>]) {
    couplings.sort_by_key(|c| c.declare_precedence());
}

/// Whether a coupling takes part in this landscape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participation {
    Participating,
    NotParticipating,
}

/// What a coupling may look at when deciding to participate
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentConstraints<'a> {
    pub configuration: &'a LandscapeConfiguration,
    pub devices: &'a [Arc<LandscapeDevice>],
}

impl EnvironmentConstraints<'_> {
    /// Devices whose discriminator equals `device_type`
    pub fn devices_of_type(&self, device_type: &str) -> usize {
        self.devices
            .iter()
            .filter(|d| d.device_type() == device_type)
            .count()
    }

    /// Items of `section` whose `leaf` is `class`, leaving out `skip: true`
    pub fn declared_items(&self, section: &str, leaf: &str, class: &str) -> usize {
        self.configuration
            .section(section)
            .iter()
            .filter(|item| item.get(leaf).and_then(Value::as_str) == Some(class))
            .filter(|item| !item.get("skip").and_then(Value::as_bool).unwrap_or(false))
            .count()
    }
}

/// A named hook a coupling contributes to the framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationPoint {
    pub coupling: CouplingKey,
    pub name: String,
}

/// Collects integration points during `attach_to_framework`
#[derive(Debug, Default)]
pub struct IntegrationRegistrar {
    points: Vec<IntegrationPoint>,
}

impl IntegrationRegistrar {
    pub fn register(&mut self, coupling: &CouplingKey, name: impl Into<String>) {
        self.points.push(IntegrationPoint {
            coupling: coupling.clone(),
            name: name.into(),
        });
    }

    pub fn into_points(self) -> Vec<IntegrationPoint> {
        self.points
    }
}

/// Everything a coordinator needs at construction time
///
/// `C::initialize` runs with the coordinator registry locked, so it must not
/// request other coordinators through `registry`.
pub struct CoordinatorContext<'a> {
    /// Key of the coupling asking for the coordinator
    pub key: CouplingKey,
    pub registry: &'a CoordinatorRegistry,
    pub resolver: Arc<dyn DeviceResolver>,
    pub devices: &'a [Arc<LandscapeDevice>],
    pub configuration: Arc<LandscapeConfiguration>,
    pub credentials: Arc<CredentialStore>,
    pub probe: Arc<dyn ConnectivityProbe>,
    pub agents: Option<Arc<dyn CommandAgentFactory>>,
    pub aspects: Aspects,
}

/// Plugin descriptor for one `(section, leaf, class)` triple
pub trait IntegrationCoupling: Send + Sync {
    fn section(&self) -> &str;

    fn leaf(&self) -> &str;

    fn class(&self) -> &str;

    fn key(&self) -> CouplingKey {
        CouplingKey::new(self.section(), self.leaf(), self.class())
    }

    fn declare_precedence(&self) -> Precedence {
        Precedence::Unordered
    }

    /// Register the hooks this coupling contributes
    fn attach_to_framework(&self, _registrar: &mut IntegrationRegistrar) -> LandscapeResult<()> {
        Ok(())
    }

    /// Decide whether the declared resources need this coupling
    fn attach_to_environment(
        &self,
        constraints: &EnvironmentConstraints<'_>,
    ) -> LandscapeResult<Participation>;

    /// Create (or join) the coordinator singleton and keep a handle to it
    fn create_coordinator(&self, ctx: &CoordinatorContext<'_>) -> LandscapeResult<()>;

    /// The coordinator created by [`IntegrationCoupling::create_coordinator`]
    fn coordinator(&self) -> Option<Arc<dyn Coordinator>>;

    fn create_landscape_device(&self, _entry: &Map<String, Value>) -> LandscapeResult<LandscapeDevice> {
        Err(LandscapeError::NotOverloaded(format!(
            "{} does not create landscape devices",
            self.key()
        )))
    }

    fn establish_presence(&self) -> LandscapeResult<()> {
        Err(LandscapeError::NotOverloaded(format!(
            "{} does not establish presence",
            self.key()
        )))
    }

    fn establish_connectivity(&self, _allow_missing: bool) -> LandscapeResult<ConnectivityOutcome> {
        Err(LandscapeError::NotOverloaded(format!(
            "{} does not establish connectivity",
            self.key()
        )))
    }

    /// Check one section item, returning `(errors, warnings)`
    fn validate_item_configuration(&self, entry: &Map<String, Value>) -> (Vec<String>, Vec<String>);

    fn diagnostic(&self, _label: &str, _level: u32, _folder: &Path) -> LandscapeResult<()> {
        Ok(())
    }
}

/// Helper for validators: require a string field
pub(crate) fn require_str(
    entry: &Map<String, Value>,
    field: &str,
    what: &str,
    errors: &mut Vec<String>,
) {
    match entry.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => {}
        Some(_) => errors.push(format!("{what} field '{field}' must be a non-empty string")),
        None => errors.push(format!("{what} must have a '{field}' field")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let key = CouplingKey::new("devices", "deviceType", "ssh");
        assert_eq!(key.to_string(), "devices:deviceType:ssh");
    }

    #[test]
    fn test_precedence_order() {
        let power: Precedence = StartupLevel::Power.into();
        let primary: Precedence = StartupLevel::PrimaryProtocol.into();

        assert!(power < primary);
        assert!(primary < Precedence::Unordered);
        assert!(Precedence::Ordered(u32::MAX) < Precedence::Unordered);
        assert_eq!(power, Precedence::Ordered(10000));
    }

    #[test]
    fn test_declared_items_leave_out_skipped() {
        let configuration = LandscapeConfiguration::new(
            serde_json::json!({
                "pod": {
                    "serial": [
                        {"name": "ts-1", "serialType": "network/tcpserial", "skip": true},
                        {"name": "ts-2", "serialType": "network/tcpserial", "skip": false},
                        {"name": "ts-3", "serialType": "other"}
                    ],
                    "power": [
                        {"name": "pdu-1", "powerType": "DliPowerSwitch", "skip": true}
                    ]
                }
            }),
            None,
        )
        .unwrap();
        let constraints = EnvironmentConstraints {
            configuration: &configuration,
            devices: &[],
        };

        assert_eq!(constraints.declared_items("serial", "serialType", "network/tcpserial"), 1);
        assert_eq!(constraints.declared_items("power", "powerType", "DliPowerSwitch"), 0);
        assert_eq!(constraints.declared_items("missing", "serialType", "network/tcpserial"), 0);
    }
}
