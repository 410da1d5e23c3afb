// Copyright (c) 2025 - Cowboy AI, Inc.
//! Activation parameters

use serde::{Deserialize, Serialize};

use crate::config::settings::flag;

/// How tolerant activation is of the real world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationParams {
    /// Declared devices that cannot be found do not fail activation
    pub allow_missing_devices: bool,
    /// Found devices that were never declared do not fail activation
    pub allow_unknown_devices: bool,
    pub validate_features: bool,
    pub validate_topology: bool,
}

impl Default for ActivationParams {
    fn default() -> Self {
        Self {
            allow_missing_devices: false,
            allow_unknown_devices: false,
            validate_features: true,
            validate_topology: true,
        }
    }
}

impl ActivationParams {
    /// Parameters from `LANDSCAPE_ALLOW_MISSING_DEVICES`,
    /// `LANDSCAPE_ALLOW_UNKNOWN_DEVICES`, `LANDSCAPE_SKIP_FEATURE_VALIDATION`
    /// and `LANDSCAPE_SKIP_TOPOLOGY_VALIDATION`
    pub fn from_env() -> Self {
        Self {
            allow_missing_devices: flag("LANDSCAPE_ALLOW_MISSING_DEVICES"),
            allow_unknown_devices: flag("LANDSCAPE_ALLOW_UNKNOWN_DEVICES"),
            validate_features: !flag("LANDSCAPE_SKIP_FEATURE_VALIDATION"),
            validate_topology: !flag("LANDSCAPE_SKIP_TOPOLOGY_VALIDATION"),
        }
    }

    pub fn allow_missing(mut self) -> Self {
        self.allow_missing_devices = true;
        self
    }

    pub fn allow_unknown(mut self) -> Self {
        self.allow_unknown_devices = true;
        self
    }

    /// Skip feature and topology validation
    pub fn without_validation(mut self) -> Self {
        self.validate_features = false;
        self.validate_topology = false;
        self
    }
}
