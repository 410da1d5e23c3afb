// Copyright (c) 2025 - Cowboy AI, Inc.
//! Configuration phase

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

use super::Landscape;
use crate::config::{CredentialStore, LandscapeConfiguration};
use crate::coupling::{CouplingRegistry, IntegrationCoupling};
use crate::domain::LandscapeDevice;
use crate::errors::{LandscapeError, LandscapeResult};
use crate::state_machine::PhaseCommand;

const DEVICE_SECTION: &str = "devices";
const DEFAULT_DEVICE_LEAF: &str = "deviceType";

/// Device table produced by the configuration phase
#[derive(Debug, Default)]
pub(super) struct DeviceTable {
    pub devices: Vec<Arc<LandscapeDevice>>,
    pub configs: Vec<Map<String, Value>>,
    pub unrecognized: Vec<Map<String, Value>>,
}

fn is_skipped(entry: &Map<String, Value>) -> bool {
    entry.get("skip").and_then(Value::as_bool).unwrap_or(false)
}

/// The coupling whose `(leaf, class)` the entry carries
fn claiming_coupling(
    claimants: &[Arc<dyn IntegrationCoupling>],
    entry: &Map<String, Value>,
) -> Option<Arc<dyn IntegrationCoupling>> {
    claimants
        .iter()
        .find(|c| entry.get(c.leaf()).and_then(Value::as_str) == Some(c.class()))
        .cloned()
}

/// Discriminator fields used by the couplings of a section
fn discriminators<'a>(claimants: &'a [Arc<dyn IntegrationCoupling>], section: &str) -> BTreeSet<&'a str> {
    let mut leaves: BTreeSet<&str> = claimants.iter().map(|c| c.leaf()).collect();
    if leaves.is_empty() && section == DEVICE_SECTION {
        leaves.insert(DEFAULT_DEVICE_LEAF);
    }
    leaves
}

/// Validate every section item against the coupling claiming it
///
/// Returns the warnings; any error fails the whole document.
pub(super) fn validate_landscape(
    configuration: &LandscapeConfiguration,
    couplings: &CouplingRegistry,
) -> LandscapeResult<Vec<String>> {
    let mut errors: Vec<(String, String)> = Vec::new();
    let mut warnings = Vec::new();

    for section in configuration.section_names() {
        let claimants = couplings.in_section(section);
        if claimants.is_empty() {
            debug!(section, "no integration coupling claims section");
            continue;
        }
        let leaves = discriminators(&claimants, section);

        for (index, item) in configuration.section(section).iter().enumerate() {
            let path = format!("/pod/{section}/{index}");
            let Some(entry) = item.as_object() else {
                errors.push((path, "item must be an object".to_string()));
                continue;
            };
            if is_skipped(entry) {
                continue;
            }

            match claiming_coupling(&claimants, entry) {
                Some(coupling) => {
                    let (item_errors, item_warnings) = coupling.validate_item_configuration(entry);
                    errors.extend(item_errors.into_iter().map(|e| (path.clone(), e)));
                    warnings.extend(item_warnings.into_iter().map(|w| format!("{path}: {w}")));
                }
                None if !leaves.iter().any(|leaf| entry.contains_key(*leaf)) => {
                    let fields: Vec<&str> = leaves.iter().copied().collect();
                    errors.push((
                        path,
                        format!("missing discriminator field '{}'", fields.join("' or '")),
                    ));
                }
                None if section != DEVICE_SECTION => {
                    warnings.push(format!("{path}: no integration coupling handles this item"));
                }
                None => {}
            }
        }
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(LandscapeError::from_findings("Landscape", &errors))
    }
}

/// Manufacture a device record for every `devices` entry
pub(super) fn build_device_table(
    configuration: &LandscapeConfiguration,
    couplings: &CouplingRegistry,
) -> LandscapeResult<DeviceTable> {
    let claimants = couplings.in_section(DEVICE_SECTION);
    let leaves = discriminators(&claimants, DEVICE_SECTION);

    let mut table = DeviceTable::default();
    let mut errors: Vec<(String, String)> = Vec::new();
    let mut identities = BTreeSet::new();

    for (index, item) in configuration.section(DEVICE_SECTION).iter().enumerate() {
        let path = format!("/pod/{DEVICE_SECTION}/{index}");
        let Some(entry) = item.as_object() else {
            errors.push((path, "device entry must be an object".to_string()));
            continue;
        };
        if is_skipped(entry) {
            debug!(%path, "skipping device entry");
            continue;
        }

        let Some(coupling) = claiming_coupling(&claimants, entry) else {
            if leaves.iter().any(|leaf| entry.contains_key(*leaf)) {
                warn!(%path, "device entry not recognized by any integration coupling");
                table.configs.push(entry.clone());
                table.unrecognized.push(entry.clone());
            } else {
                let fields: Vec<&str> = leaves.iter().copied().collect();
                errors.push((
                    path,
                    format!("device entry has no '{}'", fields.join("' or '")),
                ));
            }
            continue;
        };

        match coupling.create_landscape_device(entry) {
            Ok(device) => {
                if !identities.insert(device.identity().clone()) {
                    errors.push((
                        path,
                        format!("duplicate device identifier '{}'", device.identity()),
                    ));
                    continue;
                }
                table.configs.push(entry.clone());
                table.devices.push(Arc::new(device));
            }
            Err(err) => errors.push((path, err.to_string())),
        }
    }

    if errors.is_empty() {
        Ok(table)
    } else {
        Err(LandscapeError::from_findings("Device", &errors))
    }
}

/// Write the declared documents into `directory`
pub(super) fn record_declared(
    directory: &Path,
    configuration: &LandscapeConfiguration,
) -> LandscapeResult<()> {
    fs::create_dir_all(directory)?;

    let landscape_file = directory.join("landscape-declared.json");
    fs::write(
        &landscape_file,
        serde_json::to_string_pretty(configuration.landscape())?,
    )?;
    debug!(file = %landscape_file.display(), "recorded declared landscape");

    if let Some(topology) = configuration.topology() {
        let topology_file = directory.join("topology-declared.json");
        fs::write(&topology_file, serde_json::to_string_pretty(topology)?)?;
        debug!(file = %topology_file.display(), "recorded declared topology");
    }

    Ok(())
}

impl Landscape {
    /// Load, validate and tabulate the declared landscape
    ///
    /// Runs once; concurrent callers wait for the first one to finish.
    pub fn activate_configuration(&self) -> LandscapeResult<()> {
        let inner = &self.inner;

        inner.configuration_gate.run(|| {
            let span = info_span!("configuration", landscape = %inner.id);
            let _entered = span.enter();

            inner.tables.lock().advance(PhaseCommand::BeginConfiguration)?;

            let landscape = inner.source.load_landscape()?.ok_or_else(|| {
                LandscapeError::Configuration("no landscape document was declared".into())
            })?;
            let topology = inner.source.load_topology()?;
            let configuration = LandscapeConfiguration::new(landscape, topology)?;

            for warning in validate_landscape(&configuration, &inner.couplings)? {
                warn!(%warning, "landscape configuration warning");
            }

            if inner.settings.log_configuration {
                record_declared(&inner.settings.output_directory, &configuration)?;
            }

            let (credentials, credential_warnings) =
                CredentialStore::from_section(configuration.credentials_section())?;
            for warning in credential_warnings {
                warn!(%warning, "credential warning");
            }

            let table = build_device_table(&configuration, &inner.couplings)?;

            let mut tables = inner.tables.lock();
            tables.configuration = Some(Arc::new(configuration));
            tables.credentials = Arc::new(credentials);
            tables.devices = table.devices;
            tables.device_configs = table.configs;
            tables.unrecognized = table.unrecognized;
            tables.advance(PhaseCommand::CompleteConfiguration)?;

            info!(
                devices = tables.devices.len(),
                unrecognized = tables.unrecognized.len(),
                credentials = tables.credentials.len(),
                "📋 landscape configured"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupling::ExtensionPoints;
    use serde_json::json;

    fn configuration(pod: Value) -> LandscapeConfiguration {
        LandscapeConfiguration::new(json!({ "pod": pod }), None).unwrap()
    }

    fn builtin() -> CouplingRegistry {
        ExtensionPoints::builtin().resolve().unwrap()
    }

    #[test]
    fn test_device_table_and_unrecognized() {
        let config = configuration(json!({
            "devices": [
                {"deviceType": "ssh", "identifier": "node-a"},
                {"deviceType": "unknown-proto", "identifier": "mystery"},
                {"deviceType": "ssh", "identifier": "node-b", "skip": true}
            ]
        }));

        let table = build_device_table(&config, &builtin()).unwrap();

        assert_eq!(table.devices.len(), 1);
        assert_eq!(table.devices[0].identity().as_str(), "node-a");
        assert_eq!(table.unrecognized.len(), 1);
        assert_eq!(table.configs.len(), 2);
    }

    #[test]
    fn test_duplicate_identifiers_fail() {
        let config = configuration(json!({
            "devices": [
                {"deviceType": "ssh", "identifier": "node-a"},
                {"deviceType": "ssh", "host": "node-a"}
            ]
        }));

        let err = build_device_table(&config, &builtin()).unwrap_err();
        assert!(err.to_string().contains("duplicate device identifier 'node-a'"));
    }

    #[test]
    fn test_missing_discriminator_fails() {
        let config = configuration(json!({"devices": [{"identifier": "node-a"}]}));

        assert!(validate_landscape(&config, &builtin()).is_err());
        assert!(build_device_table(&config, &builtin()).is_err());
    }

    /// Claims `devices` entries by a `kind` field
    struct KindCoupling;

    impl IntegrationCoupling for KindCoupling {
        fn section(&self) -> &str {
            DEVICE_SECTION
        }

        fn leaf(&self) -> &str {
            "kind"
        }

        fn class(&self) -> &str {
            "bmc"
        }

        fn attach_to_environment(
            &self,
            _constraints: &crate::coupling::EnvironmentConstraints<'_>,
        ) -> LandscapeResult<crate::coupling::Participation> {
            Ok(crate::coupling::Participation::NotParticipating)
        }

        fn create_coordinator(&self, _ctx: &crate::coupling::CoordinatorContext<'_>) -> LandscapeResult<()> {
            Ok(())
        }

        fn coordinator(&self) -> Option<Arc<dyn crate::coordinator::Coordinator>> {
            None
        }

        fn validate_item_configuration(&self, _entry: &Map<String, Value>) -> (Vec<String>, Vec<String>) {
            (Vec::new(), Vec::new())
        }
    }

    #[test]
    fn test_missing_discriminator_names_every_leaf() {
        let mut couplings = builtin();
        couplings.register(Arc::new(KindCoupling)).unwrap();
        let config = configuration(json!({"devices": [{"identifier": "node-a"}]}));

        let err = build_device_table(&config, &couplings).unwrap_err().to_string();
        assert!(err.contains("device entry has no 'deviceType' or 'kind'"), "{err}");
    }

    #[test]
    fn test_every_section_is_validated() {
        let config = configuration(json!({
            "devices": [{"deviceType": "ssh", "identifier": "node-a", "host": ""}],
            "serial": [{"serialType": "network/tcpserial", "name": "ts-1"}],
            "power": [{"powerType": "DliPowerSwitch", "name": "pdu-1", "host": "10.0.0.7"}]
        }));

        let err = validate_landscape(&config, &builtin()).unwrap_err().to_string();
        assert!(err.contains("/pod/devices/0"));
        assert!(err.contains("/pod/serial/0"));
        assert!(!err.contains("/pod/power/0"));
    }

    #[test]
    fn test_unclaimed_item_in_other_section_warns() {
        let config = configuration(json!({
            "power": [{"powerType": "ApcSwitch", "name": "apc"}]
        }));

        let warnings = validate_landscape(&config, &builtin()).unwrap();
        assert_eq!(warnings.len(), 1);
    }
}
