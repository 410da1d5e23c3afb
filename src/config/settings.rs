// Copyright (c) 2025 - Cowboy AI, Inc.
//! Process-level landscape settings

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::aspects::Aspects;

use super::source::JsonFileSource;

/// Where the landscape gets its documents and where it records them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandscapeSettings {
    pub landscape_files: Vec<PathBuf>,
    pub topology_files: Vec<PathBuf>,
    pub output_directory: PathBuf,
    /// Write the declared documents into `output_directory`
    pub log_configuration: bool,
    pub interactive: bool,
    /// Policy used by coordinators when probing devices
    pub presence_aspects: Aspects,
}

impl Default for LandscapeSettings {
    fn default() -> Self {
        Self {
            landscape_files: Vec::new(),
            topology_files: Vec::new(),
            output_directory: PathBuf::from("./landscape-output"),
            log_configuration: false,
            interactive: false,
            presence_aspects: Aspects::presence(),
        }
    }
}

impl LandscapeSettings {
    /// Load settings from the environment
    ///
    /// File lists are separated by the platform path separator (`:` on
    /// unix). Flags accept `1`, `true`, `yes` and `on`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            landscape_files: path_list("LANDSCAPE_FILES"),
            topology_files: path_list("LANDSCAPE_TOPOLOGY_FILES"),
            output_directory: env::var_os("LANDSCAPE_OUTPUT_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_directory),
            log_configuration: flag("LANDSCAPE_LOG_CONFIGURATION"),
            interactive: flag("LANDSCAPE_INTERACTIVE"),
            presence_aspects: defaults.presence_aspects,
        }
    }

    /// File source over the configured documents
    pub fn file_source(&self) -> JsonFileSource {
        JsonFileSource::new(self.landscape_files.clone(), self.topology_files.clone())
    }
}

fn path_list(name: &str) -> Vec<PathBuf> {
    env::var_os(name)
        .map(|value| env::split_paths(&value).filter(|p| !p.as_os_str().is_empty()).collect())
        .unwrap_or_default()
}

/// Parse a boolean environment flag
pub fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
