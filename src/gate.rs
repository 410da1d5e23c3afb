// Copyright (c) 2025 - Cowboy AI, Inc.
//! One-shot phase gate
//!
//! Each landscape phase runs its body at most once. The first caller runs it;
//! concurrent callers block until the gate fires and then return the same
//! outcome. A failed body (error or panic) leaves the gate failed for good.
//!
//! ```text
//! Open ──first caller──▶ Running ──Ok──▶ Completed
//!                           │
//!                           └──Err / panic──▶ Failed
//! ```

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::errors::{LandscapeError, LandscapeResult};

/// Observable gate state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    Open,
    Running,
    Completed,
    Failed(String),
}

/// Reusable one-shot latch for a named phase
#[derive(Debug)]
pub struct PhaseGate {
    phase: &'static str,
    state: Mutex<GateStatus>,
    fired: Condvar,
}

impl PhaseGate {
    pub fn new(phase: &'static str) -> Self {
        Self {
            phase,
            state: Mutex::new(GateStatus::Open),
            fired: Condvar::new(),
        }
    }

    pub fn phase(&self) -> &'static str {
        self.phase
    }

    pub fn status(&self) -> GateStatus {
        self.state.lock().clone()
    }

    pub fn is_completed(&self) -> bool {
        *self.state.lock() == GateStatus::Completed
    }

    /// Run `body` if nobody has, otherwise wait for the outcome
    ///
    /// The caller that runs the body receives its error unchanged; every
    /// other caller receives [`LandscapeError::PhaseFailed`].
    pub fn run<F>(&self, body: F) -> LandscapeResult<()>
    where
        F: FnOnce() -> LandscapeResult<()>,
    {
        {
            let mut state = self.state.lock();
            loop {
                match &*state {
                    GateStatus::Open => {
                        *state = GateStatus::Running;
                        break;
                    }
                    GateStatus::Running => {
                        debug!(phase = self.phase, "waiting for phase gate");
                        self.fired.wait(&mut state);
                    }
                    GateStatus::Completed => return Ok(()),
                    GateStatus::Failed(reason) => {
                        return Err(LandscapeError::PhaseFailed {
                            phase: self.phase.to_string(),
                            reason: reason.clone(),
                        })
                    }
                }
            }
        }

        let mut release = Release {
            gate: self,
            outcome: None,
        };

        let result = body();
        release.outcome = Some(match &result {
            Ok(()) => GateStatus::Completed,
            Err(err) => GateStatus::Failed(format!("{}: {}", err.category(), err)),
        });
        result
    }
}

/// Fires the gate when dropped, including during unwinding
struct Release<'a> {
    gate: &'a PhaseGate,
    outcome: Option<GateStatus>,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| GateStatus::Failed("phase body panicked".to_string()));

        if let GateStatus::Failed(reason) = &outcome {
            warn!(phase = self.gate.phase, %reason, "phase gate failed");
        }

        *self.gate.state.lock() = outcome;
        self.gate.fired.notify_all();
    }
}
