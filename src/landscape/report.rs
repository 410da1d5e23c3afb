// Copyright (c) 2025 - Cowboy AI, Inc.
//! Connectivity reports
//!
//! Per-device failures accumulate here. They only become a
//! [`LandscapeError`](crate::errors::LandscapeError) when the operations
//! phase decides the activation parameters do not tolerate them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One device that could not be reached or commanded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityFailure {
    pub device: String,
    pub location: String,
    pub reason: String,
}

/// Reconciled device lists for one protocol
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolReport {
    pub matching: Vec<String>,
    pub missing: Vec<String>,
    pub unknown: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ConnectivityFailure>,
}

impl ProtocolReport {
    /// Append another report, keeping each key once
    pub fn merge(&mut self, other: ProtocolReport) {
        fn extend_unique(into: &mut Vec<String>, from: Vec<String>) {
            for key in from {
                if !into.contains(&key) {
                    into.push(key);
                }
            }
        }

        extend_unique(&mut self.matching, other.matching);
        extend_unique(&mut self.missing, other.missing);
        extend_unique(&mut self.unknown, other.unknown);
        self.failures.extend(other.failures);
    }
}

/// What a coupling returns from `establish_connectivity`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectivityOutcome {
    pub protocol: String,
    pub config_errors: Vec<String>,
    pub report: ProtocolReport,
}

/// Protocol name to reconciled device lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectivityReport {
    protocols: BTreeMap<String, ProtocolReport>,
}

impl ConnectivityReport {
    pub fn merge(&mut self, protocol: &str, report: ProtocolReport) {
        self.protocol_mut(protocol).merge(report);
    }

    pub fn protocol(&self, protocol: &str) -> Option<&ProtocolReport> {
        self.protocols.get(protocol)
    }

    pub fn protocol_mut(&mut self, protocol: &str) -> &mut ProtocolReport {
        self.protocols.entry(protocol.to_string()).or_default()
    }

    pub fn protocols(&self) -> impl Iterator<Item = (&str, &ProtocolReport)> {
        self.protocols.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `(protocol, device)` pairs that were expected but not found
    pub fn missing_devices(&self) -> Vec<(String, String)> {
        self.collect(|r| &r.missing)
    }

    /// `(protocol, device)` pairs that were found but never declared
    pub fn unknown_devices(&self) -> Vec<(String, String)> {
        self.collect(|r| &r.unknown)
    }

    /// Devices matched by at least one protocol
    pub fn matched_devices(&self) -> Vec<String> {
        let mut matched: Vec<String> = Vec::new();
        for report in self.protocols.values() {
            for key in &report.matching {
                if !matched.contains(key) {
                    matched.push(key.clone());
                }
            }
        }
        matched
    }

    pub fn is_clean(&self) -> bool {
        self.protocols
            .values()
            .all(|r| r.missing.is_empty() && r.unknown.is_empty() && r.failures.is_empty())
    }

    fn collect<F>(&self, pick: F) -> Vec<(String, String)>
    where
        F: Fn(&ProtocolReport) -> &Vec<String>,
    {
        self.protocols
            .iter()
            .flat_map(|(protocol, report)| {
                pick(report)
                    .iter()
                    .map(move |device| (protocol.clone(), device.clone()))
            })
            .collect()
    }
}
