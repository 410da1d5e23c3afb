// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for landscape operations
//!
//! Errors follow the landscape taxonomy:
//!
//! - **Configuration**: the declared landscape is wrong (fatal to startup)
//! - **Semantic**: programmer misuse, never retried
//! - **Connectivity**: aggregated per-protocol findings escalated at a phase boundary
//! - **NotOverloaded**: a trait default was reached that a concrete type should have replaced
//!
//! Per-device failures are never raised directly. They are accumulated in
//! reports and only turned into a [`LandscapeError`] at phase boundaries.

use thiserror::Error;

use crate::domain::FriendlyIdentifierError;
use crate::landscape::report::ConnectivityReport;
use crate::state_machine::TransitionError;

/// Errors that can occur while standing up or using a landscape
#[derive(Debug, Error)]
pub enum LandscapeError {
    /// The declared configuration is invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// API misuse (wrong phase, duplicate registration, ...)
    #[error("Semantic error: {0}")]
    Semantic(String),

    /// Devices could not be reached and the activation parameters do not allow it
    #[error("Connectivity error: {message}")]
    Connectivity {
        message: String,
        report: Box<ConnectivityReport>,
    },

    /// A default trait method was invoked that must be provided by the concrete type
    #[error("Not overloaded: {0}")]
    NotOverloaded(String),

    /// Device reservation failed
    #[error("Checkout error: {0}")]
    Checkout(String),

    /// Device return failed
    #[error("Checkin error: {0}")]
    Checkin(String),

    /// A gated phase failed; every caller of that phase observes the same failure
    #[error("Landscape phase '{phase}' failed: {reason}")]
    PhaseFailed { phase: String, reason: String },

    /// Friendly identifier validation
    #[error("Invalid identifier: {0}")]
    Identifier(#[from] FriendlyIdentifierError),

    /// Phase state machine rejected a transition
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    /// File system error while loading or recording configuration
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for landscape operations
pub type LandscapeResult<T> = Result<T, LandscapeError>;

impl LandscapeError {
    /// Build a configuration error from a list of `(path, message)` findings
    pub fn from_findings(title: &str, findings: &[(String, String)]) -> Self {
        let mut lines = vec![format!("ERROR {title} validation failures:")];
        for (path, msg) in findings {
            lines.push(format!("    {path}: {msg}"));
        }
        LandscapeError::Configuration(lines.join("\n"))
    }

    /// Short category name, used in logs and phase failure records
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Semantic(_) => "semantic",
            Self::Connectivity { .. } => "connectivity",
            Self::NotOverloaded(_) => "not_overloaded",
            Self::Checkout(_) => "checkout",
            Self::Checkin(_) => "checkin",
            Self::PhaseFailed { .. } => "phase_failed",
            Self::Identifier(_) => "identifier",
            Self::Transition(_) => "transition",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}

impl From<std::io::Error> for LandscapeError {
    fn from(err: std::io::Error) -> Self {
        LandscapeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LandscapeError {
    fn from(err: serde_json::Error) -> Self {
        LandscapeError::Serialization(err.to_string())
    }
}
