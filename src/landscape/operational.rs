// Copyright (c) 2025 - Cowboy AI, Inc.
//! Operations phase

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, info_span};

use super::{ActivationParams, ConnectivityReport, Landscape};
use crate::config::LandscapeConfiguration;
use crate::coupling::IntegrationCoupling;
use crate::domain::LandscapeDevice;
use crate::errors::{LandscapeError, LandscapeResult};
use crate::state_machine::PhaseCommand;

fn describe(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(protocol, device)| format!("{protocol}/{device}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The first coupling of each coordinator, in order
///
/// Couplings sharing a coordinator would otherwise probe its devices once
/// per coupling.
fn one_per_coordinator(couplings: &[Arc<dyn IntegrationCoupling>]) -> Vec<Arc<dyn IntegrationCoupling>> {
    let mut seen = HashSet::new();
    couplings
        .iter()
        .filter(|coupling| match coupling.coordinator() {
            Some(coordinator) if !seen.insert(coordinator.core().id()) => {
                debug!(coupling = %coupling.key(), "coordinator already driven by another coupling");
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}

/// Escalate missing or unknown devices the parameters do not tolerate
pub(super) fn check_reconciliation(
    report: &ConnectivityReport,
    params: &ActivationParams,
) -> LandscapeResult<()> {
    let missing = report.missing_devices();
    if !missing.is_empty() && !params.allow_missing_devices {
        return Err(LandscapeError::Connectivity {
            message: format!("missing devices: {}", describe(&missing)),
            report: Box::new(report.clone()),
        });
    }

    let unknown = report.unknown_devices();
    if !unknown.is_empty() && !params.allow_unknown_devices {
        return Err(LandscapeError::Connectivity {
            message: format!("unknown devices: {}", describe(&unknown)),
            report: Box::new(report.clone()),
        });
    }

    Ok(())
}

/// Every required feature must be offered by a matched device
pub(super) fn validate_features(
    configuration: &LandscapeConfiguration,
    devices: &[Arc<LandscapeDevice>],
    report: &ConnectivityReport,
) -> LandscapeResult<()> {
    let matched = report.matched_devices();

    let findings: Vec<(String, String)> = configuration
        .required_features()
        .into_iter()
        .filter(|feature| {
            !devices
                .iter()
                .any(|d| d.has_feature(feature) && matched.iter().any(|m| m == d.identity().as_str()))
        })
        .map(|feature| {
            (
                "/pod/environment/features".to_string(),
                format!("no matched device provides feature '{feature}'"),
            )
        })
        .collect();

    if findings.is_empty() {
        Ok(())
    } else {
        Err(LandscapeError::from_findings("Feature", &findings))
    }
}

/// Topology groups must name existing devices that agree on their group
pub(super) fn validate_topology(
    configuration: &LandscapeConfiguration,
    devices: &[Arc<LandscapeDevice>],
) -> LandscapeResult<()> {
    let mut findings = Vec::new();

    for (group, members) in configuration.topology_groups() {
        for member in members {
            let path = format!("/groups/{group}");
            match devices.iter().find(|d| d.identity().as_str() == member) {
                None => findings.push((path, format!("unknown device '{member}'"))),
                Some(device) => {
                    if let Some(declared) = device.group().filter(|g| *g != group) {
                        findings.push((
                            path,
                            format!("device '{member}' declares group '{declared}'"),
                        ));
                    }
                }
            }
        }
    }

    if findings.is_empty() {
        Ok(())
    } else {
        Err(LandscapeError::from_findings("Topology", &findings))
    }
}

impl Landscape {
    /// Bring every participating coordinator up and reconcile the result
    ///
    /// Completes integration first if needed. On success the landscape is
    /// operational.
    pub fn activate_operations(&self, params: &ActivationParams) -> LandscapeResult<()> {
        self.activate_integration(params)?;

        let inner = &self.inner;
        inner.operations_gate.run(|| {
            let span = info_span!("operations", landscape = %inner.id);
            let _entered = span.enter();

            let (participating, configuration, devices) = {
                let tables = inner.tables.lock();
                let configuration = tables.configuration.clone().ok_or_else(|| {
                    LandscapeError::Semantic("operations without a loaded configuration".into())
                })?;
                (tables.participating.clone(), configuration, tables.devices.clone())
            };

            let drivers = one_per_coordinator(&participating);
            for coupling in &drivers {
                coupling.establish_presence()?;
            }

            let mut report = ConnectivityReport::default();
            let mut config_errors = Vec::new();
            for coupling in &drivers {
                let outcome = coupling.establish_connectivity(params.allow_missing_devices)?;
                let key = coupling.key().to_string();
                config_errors.extend(outcome.config_errors.into_iter().map(|e| (key.clone(), e)));
                report.merge(&outcome.protocol, outcome.report);
            }

            inner.tables.lock().report = Some(report.clone());

            if !config_errors.is_empty() {
                return Err(LandscapeError::from_findings("Coupling", &config_errors));
            }

            if let Err(err) = check_reconciliation(&report, params) {
                error!(error = %err, "landscape connectivity check failed");
                if inner.settings.interactive {
                    if let Ok(text) = serde_json::to_string_pretty(&report) {
                        info!("connectivity report:\n{text}");
                    }
                }
                return Err(err);
            }

            if params.validate_features {
                validate_features(&configuration, &devices, &report)?;
            }
            if params.validate_topology {
                validate_topology(&configuration, &devices)?;
            }

            inner.tables.lock().advance(PhaseCommand::CompleteOperations)?;
            info!(
                matched = report.matched_devices().len(),
                clean = report.is_clean(),
                "🚀 landscape operational"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landscape::ProtocolReport;
    use serde_json::{json, Value};

    fn devices(entries: Value) -> Vec<Arc<LandscapeDevice>> {
        entries
            .as_array()
            .unwrap()
            .iter()
            .map(|e| {
                Arc::new(LandscapeDevice::from_config("ssh", e.as_object().cloned().unwrap()).unwrap())
            })
            .collect()
    }

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn report(matching: &[&str], missing: &[&str], unknown: &[&str]) -> ConnectivityReport {
        let mut report = ConnectivityReport::default();
        report.merge(
            "ssh",
            ProtocolReport {
                matching: keys(matching),
                missing: keys(missing),
                unknown: keys(unknown),
                failures: Vec::new(),
            },
        );
        report
    }

    #[test]
    fn test_missing_devices_fail_unless_allowed() {
        let report = report(&[], &["node-a"], &[]);

        let err = check_reconciliation(&report, &ActivationParams::default()).unwrap_err();
        assert!(matches!(err, LandscapeError::Connectivity { .. }));
        assert!(err.to_string().contains("ssh/node-a"));

        assert!(check_reconciliation(&report, &ActivationParams::default().allow_missing()).is_ok());
    }

    #[test]
    fn test_unknown_devices_fail_unless_allowed() {
        let report = report(&["node-a"], &[], &["stranger"]);

        assert!(check_reconciliation(&report, &ActivationParams::default()).is_err());
        assert!(check_reconciliation(&report, &ActivationParams::default().allow_unknown()).is_ok());
    }

    #[test]
    fn test_features_need_matched_devices() {
        let config = LandscapeConfiguration::new(
            json!({"pod": {"environment": {"features": ["gpu"]}}}),
            None,
        )
        .unwrap();
        let devices = devices(json!([
            {"identifier": "node-a", "features": ["gpu"]},
            {"identifier": "node-b"}
        ]));

        assert!(validate_features(&config, &devices, &report(&["node-a"], &[], &[])).is_ok());
        assert!(validate_features(&config, &devices, &report(&["node-b"], &["node-a"], &[])).is_err());
    }

    #[test]
    fn test_topology_groups() {
        let devices = devices(json!([
            {"identifier": "node-a", "group": "rack-1"},
            {"identifier": "node-b"}
        ]));

        let good = LandscapeConfiguration::new(
            json!({"pod": {}}),
            Some(json!({"groups": {"rack-1": ["node-a", "node-b"]}})),
        )
        .unwrap();
        assert!(validate_topology(&good, &devices).is_ok());

        let bad = LandscapeConfiguration::new(
            json!({"pod": {}}),
            Some(json!({"groups": {"rack-2": ["node-a", "ghost"]}})),
        )
        .unwrap();
        let text = validate_topology(&bad, &devices).unwrap_err().to_string();
        assert!(text.contains("declares group 'rack-1'"));
        assert!(text.contains("unknown device 'ghost'"));
    }
}
