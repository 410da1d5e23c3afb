// Copyright (c) 2025 - Cowboy AI, Inc.
//! Landscape Configuration
//!
//! The landscape document looks like:
//!
//! ```json
//! {
//!   "pod": {
//!     "environment": { "label": "lab-1", "features": ["gpu"] },
//!     "devices": [ { "deviceType": "ssh", "identifier": "node-a" } ],
//!     "serial":  [ { "name": "ts-1", "serialType": "network/tcpserial", ... } ],
//!     "power":   [ { "name": "pdu-1", "powerType": "DliPowerSwitch", ... } ]
//!   },
//!   "credentials": [ ... ]
//! }
//! ```
//!
//! The optional topology document carries `groups`, a map of group name to
//! device identifiers.

pub mod credentials;
pub mod settings;
pub mod source;

pub use credentials::{Credential, CredentialStore};
pub use settings::LandscapeSettings;
pub use source::{merge_documents, ConfigurationSource, JsonFileSource, StaticSource};

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::errors::{LandscapeError, LandscapeResult};

/// Loaded landscape and topology documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandscapeConfiguration {
    landscape: Map<String, Value>,
    topology: Option<Value>,
}

impl LandscapeConfiguration {
    /// Wrap loaded documents
    ///
    /// The landscape document must be an object with a `pod` object.
    pub fn new(landscape: Value, topology: Option<Value>) -> LandscapeResult<Self> {
        let Value::Object(landscape) = landscape else {
            return Err(LandscapeError::from_findings(
                "Landscape",
                &[("/".to_string(), "document must be an object".to_string())],
            ));
        };

        match landscape.get("pod") {
            Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(LandscapeError::from_findings(
                    "Landscape",
                    &[("/pod".to_string(), "'pod' must be an object".to_string())],
                ))
            }
            None => {
                return Err(LandscapeError::from_findings(
                    "Landscape",
                    &[("/pod".to_string(), "'pod' section is required".to_string())],
                ))
            }
        }

        Ok(Self {
            landscape,
            topology,
        })
    }

    /// The whole landscape document
    pub fn landscape(&self) -> &Map<String, Value> {
        &self.landscape
    }

    pub fn topology(&self) -> Option<&Value> {
        self.topology.as_ref()
    }

    pub fn pod(&self) -> &Map<String, Value> {
        static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
        self.landscape
            .get("pod")
            .and_then(Value::as_object)
            .unwrap_or_else(|| EMPTY.get_or_init(Map::new))
    }

    pub fn environment(&self) -> Map<String, Value> {
        self.pod()
            .get("environment")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Items of a pod section, empty when the section is absent
    pub fn section(&self, name: &str) -> &[Value] {
        self.pod()
            .get(name)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Names of the pod sections holding item arrays
    pub fn section_names(&self) -> Vec<&str> {
        self.pod()
            .iter()
            .filter(|(_, v)| v.is_array())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn credentials_section(&self) -> &[Value] {
        self.landscape
            .get("credentials")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Features the environment requires, from `pod.environment.features`
    pub fn required_features(&self) -> Vec<String> {
        self.environment()
            .get("features")
            .and_then(Value::as_array)
            .map(|f| f.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Topology `groups`: group name to member identifiers
    pub fn topology_groups(&self) -> BTreeMap<String, Vec<String>> {
        let Some(groups) = self
            .topology
            .as_ref()
            .and_then(|t| t.get("groups"))
            .and_then(Value::as_object)
        else {
            return BTreeMap::new();
        };

        groups
            .iter()
            .map(|(name, members)| {
                let members = members
                    .as_array()
                    .map(|m| m.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default();
                (name.clone(), members)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pod_required() {
        let err = LandscapeConfiguration::new(json!({"credentials": []}), None).unwrap_err();
        assert!(err.to_string().contains("'pod' section is required"));

        let err = LandscapeConfiguration::new(json!([1, 2]), None).unwrap_err();
        assert!(matches!(err, LandscapeError::Configuration(_)));
    }

    #[test]
    fn test_accessors() {
        let config = LandscapeConfiguration::new(
            json!({
                "pod": {
                    "environment": {"label": "lab", "features": ["gpu"]},
                    "devices": [{"deviceType": "ssh", "identifier": "node-a"}],
                    "power": []
                },
                "credentials": [{"identifier": "c"}]
            }),
            Some(json!({"groups": {"rack-1": ["node-a"]}})),
        )
        .unwrap();

        assert_eq!(config.section("devices").len(), 1);
        assert!(config.section("serial").is_empty());
        assert_eq!(config.section_names(), vec!["devices", "power"]);
        assert_eq!(config.credentials_section().len(), 1);
        assert_eq!(config.required_features(), vec!["gpu".to_string()]);
        assert_eq!(config.environment()["label"], "lab");
        assert_eq!(config.topology_groups()["rack-1"], vec!["node-a".to_string()]);
    }
}
