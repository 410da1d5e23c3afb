// Copyright (c) 2025 - Cowboy AI, Inc.
//! Configuration sources
//!
//! A [`ConfigurationSource`] hands the landscape its raw documents. Loads
//! may touch the file system or block, so the landscape always calls them
//! with its lock released.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{LandscapeError, LandscapeResult};

/// Supplies the landscape and topology documents
pub trait ConfigurationSource: Send + Sync {
    /// The landscape document, `None` when nothing is declared
    fn load_landscape(&self) -> LandscapeResult<Option<Value>>;

    /// The topology document, `None` when nothing is declared
    fn load_topology(&self) -> LandscapeResult<Option<Value>>;
}

/// In-memory documents
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    landscape: Option<Value>,
    topology: Option<Value>,
}

impl StaticSource {
    pub fn new(landscape: Value) -> Self {
        Self {
            landscape: Some(landscape),
            topology: None,
        }
    }

    pub fn with_topology(mut self, topology: Value) -> Self {
        self.topology = Some(topology);
        self
    }
}

impl ConfigurationSource for StaticSource {
    fn load_landscape(&self) -> LandscapeResult<Option<Value>> {
        Ok(self.landscape.clone())
    }

    fn load_topology(&self) -> LandscapeResult<Option<Value>> {
        Ok(self.topology.clone())
    }
}

/// JSON files merged in order, later files overriding earlier ones
#[derive(Debug, Clone, Default)]
pub struct JsonFileSource {
    landscape_files: Vec<PathBuf>,
    topology_files: Vec<PathBuf>,
}

impl JsonFileSource {
    pub fn new(landscape_files: Vec<PathBuf>, topology_files: Vec<PathBuf>) -> Self {
        Self {
            landscape_files,
            topology_files,
        }
    }

    fn load_merged(files: &[PathBuf]) -> LandscapeResult<Option<Value>> {
        let mut merged: Option<Value> = None;

        for file in files {
            let document = read_json(file)?;
            debug!(file = %file.display(), "loaded configuration file");
            match merged.as_mut() {
                Some(base) => merge_documents(base, document),
                None => merged = Some(document),
            }
        }

        Ok(merged)
    }
}

impl ConfigurationSource for JsonFileSource {
    fn load_landscape(&self) -> LandscapeResult<Option<Value>> {
        Self::load_merged(&self.landscape_files)
    }

    fn load_topology(&self) -> LandscapeResult<Option<Value>> {
        Self::load_merged(&self.topology_files)
    }
}

fn read_json(path: &Path) -> LandscapeResult<Value> {
    let text = fs::read_to_string(path)
        .map_err(|e| LandscapeError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| LandscapeError::Configuration(format!("{}: {e}", path.display())))
}

/// Deep merge `overlay` into `base`
///
/// Objects merge key by key; everything else, arrays included, is replaced.
pub fn merge_documents(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_documents(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_merge_objects_and_replace_arrays() {
        let mut base = json!({
            "pod": {
                "environment": {"label": "lab", "features": ["a"]},
                "devices": [{"identifier": "x"}]
            }
        });
        merge_documents(
            &mut base,
            json!({
                "pod": {
                    "environment": {"features": ["b", "c"]},
                    "power": []
                }
            }),
        );

        assert_eq!(
            base,
            json!({
                "pod": {
                    "environment": {"label": "lab", "features": ["b", "c"]},
                    "devices": [{"identifier": "x"}],
                    "power": []
                }
            })
        );
    }

    #[test]
    fn test_json_files_merge_in_order() {
        let dir = std::env::temp_dir().join(format!("cim-landscape-src-{}", uuid::Uuid::now_v7()));
        fs::create_dir_all(&dir).unwrap();
        let first = dir.join("first.json");
        let second = dir.join("second.json");
        fs::write(&first, r#"{"pod": {"environment": {"label": "one"}}}"#).unwrap();
        fs::write(&second, r#"{"pod": {"environment": {"label": "two"}}}"#).unwrap();

        let source = JsonFileSource::new(vec![first, second], Vec::new());
        let merged = source.load_landscape().unwrap().unwrap();

        assert_eq!(merged["pod"]["environment"]["label"], "two");
        assert!(source.load_topology().unwrap().is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = JsonFileSource::new(vec![PathBuf::from("/nonexistent/landscape.json")], vec![]);
        assert!(matches!(source.load_landscape(), Err(LandscapeError::Io(_))));
    }
}
