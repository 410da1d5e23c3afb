// Copyright (c) 2025 - Cowboy AI, Inc.
//! Landscape Phase State Machine
//!
//! # States
//!
//! - Unconfigured: nothing loaded
//! - Configuring: configuration phase body running
//! - Configured: devices declared, queries available
//! - Integrating: couplings attaching, coordinators being created
//! - Integrated: coordinators exist
//! - Operational: presence and connectivity established (terminal)
//!
//! # Inputs
//!
//! - BeginConfiguration: Unconfigured → Configuring
//! - CompleteConfiguration: Configuring → Configured
//! - BeginIntegration: Configured → Integrating
//! - CompleteIntegration: Integrating → Integrated
//! - CompleteOperations: Integrated → Operational
//!
//! There is no backward transition.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Landscape lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandscapePhase {
    Unconfigured,
    Configuring,
    Configured,
    Integrating,
    Integrated,
    Operational,
}

impl LandscapePhase {
    /// Canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Configuring => "configuring",
            Self::Configured => "configured",
            Self::Integrating => "integrating",
            Self::Integrated => "integrated",
            Self::Operational => "operational",
        }
    }

    /// Phases in which no gate body is running
    pub fn is_stable(&self) -> bool {
        matches!(
            self,
            Self::Unconfigured | Self::Configured | Self::Integrated | Self::Operational
        )
    }

    /// Whether the configuration phase has completed
    pub fn is_configured(&self) -> bool {
        *self >= Self::Configured
    }

    /// Whether the landscape reached its terminal phase
    pub fn is_operational(&self) -> bool {
        *self == Self::Operational
    }
}

impl fmt::Display for LandscapePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase command (FSM input)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseCommand {
    BeginConfiguration,
    CompleteConfiguration,
    BeginIntegration,
    CompleteIntegration,
    CompleteOperations,
}

/// Transition output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseOutput {
    /// Whether the new phase is one a gate waits for
    pub reached_stable: bool,
}

impl StateMachine for LandscapePhase {
    type Input = PhaseCommand;
    type Output = PhaseOutput;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use LandscapePhase::*;
        use PhaseCommand::*;

        let next = match (self, input) {
            (Unconfigured, BeginConfiguration) => Configuring,
            (Configuring, CompleteConfiguration) => Configured,
            (Configured, BeginIntegration) => Integrating,
            (Integrating, CompleteIntegration) => Integrated,
            (Integrated, CompleteOperations) => Operational,
            (from, cmd) => {
                return Err(TransitionError::InvalidTransition {
                    from: from.to_string(),
                    to: format!("{cmd:?}"),
                })
            }
        };

        Ok((
            next,
            PhaseOutput {
                reached_stable: next.is_stable(),
            },
        ))
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        use LandscapePhase::*;
        use PhaseCommand::*;

        match self {
            Unconfigured => vec![BeginConfiguration],
            Configuring => vec![CompleteConfiguration],
            Configured => vec![BeginIntegration],
            Integrating => vec![CompleteIntegration],
            Integrated => vec![CompleteOperations],
            Operational => Vec::new(),
        }
    }
}
