// Copyright (c) 2025 - Cowboy AI, Inc.
//! Retry and timeout policy for probes and agent commands

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// How an action is repeated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPattern {
    /// One attempt, its result is final
    SingleCall,
    /// Retry until success or until the completion timeout runs out
    DoUntilSuccess,
}

/// Timeout, interval and retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Aspects {
    pub action_pattern: ActionPattern,
    /// Overall budget for all attempts
    pub completion_timeout: Duration,
    /// Pause between attempts
    pub completion_interval: Duration,
    /// Budget of a single attempt
    pub inactivity_timeout: Duration,
    /// Exit codes accepted besides 0
    pub allowed_error_codes: Vec<i32>,
    /// Log every n-th failed attempt
    pub retry_logging_interval: u32,
}

impl Default for Aspects {
    fn default() -> Self {
        Self {
            action_pattern: ActionPattern::SingleCall,
            completion_timeout: Duration::from_secs(600),
            completion_interval: Duration::from_secs(10),
            inactivity_timeout: Duration::from_secs(600),
            allowed_error_codes: Vec::new(),
            retry_logging_interval: 5,
        }
    }
}

impl Aspects {
    /// Policy used for reachability probes during activation
    pub fn presence() -> Self {
        Self {
            action_pattern: ActionPattern::DoUntilSuccess,
            completion_timeout: Duration::from_secs(10),
            completion_interval: Duration::from_secs(1),
            inactivity_timeout: Duration::from_secs(2),
            ..Self::default()
        }
    }

    /// Single attempt bounded by `timeout`
    pub fn single(timeout: Duration) -> Self {
        Self {
            action_pattern: ActionPattern::SingleCall,
            completion_timeout: timeout,
            completion_interval: Duration::ZERO,
            inactivity_timeout: timeout,
            ..Self::default()
        }
    }

    /// Whether a command exit status counts as success
    pub fn accepts_status(&self, status: i32) -> bool {
        status == 0 || self.allowed_error_codes.contains(&status)
    }

    /// Run `action` according to the policy
    ///
    /// Returns the first success, or the last failure once the pattern
    /// gives up. At least one attempt is always made.
    pub fn attempt<T, E, F>(&self, what: &str, mut action: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: std::fmt::Display,
    {
        let start = Instant::now();
        let mut tries: u32 = 0;

        loop {
            tries += 1;
            let err = match action() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let retry = self.action_pattern == ActionPattern::DoUntilSuccess
                && start
                    .elapsed()
                    .checked_add(self.completion_interval)
                    .is_some_and(|next| next < self.completion_timeout);
            if !retry {
                return Err(err);
            }

            if self.retry_logging_interval > 0 && tries % self.retry_logging_interval == 0 {
                debug!(what, tries, error = %err, "still retrying");
            }
            std::thread::sleep(self.completion_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_call_tries_once() {
        let mut calls = 0;
        let result: Result<(), String> = Aspects::single(Duration::from_millis(10))
            .attempt("probe", || {
                calls += 1;
                Err("refused".to_string())
            });

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_do_until_success_retries() {
        let aspects = Aspects {
            action_pattern: ActionPattern::DoUntilSuccess,
            completion_timeout: Duration::from_secs(5),
            completion_interval: Duration::from_millis(1),
            ..Aspects::default()
        };

        let mut calls = 0;
        let result: Result<u32, String> = aspects.attempt("probe", || {
            calls += 1;
            if calls < 3 {
                Err("not yet".to_string())
            } else {
                Ok(calls)
            }
        });

        assert_eq!(result, Ok(3));
    }

    #[test]
    fn test_do_until_success_gives_up() {
        let aspects = Aspects {
            action_pattern: ActionPattern::DoUntilSuccess,
            completion_timeout: Duration::from_millis(30),
            completion_interval: Duration::from_millis(5),
            ..Aspects::default()
        };

        let result: Result<(), &str> = aspects.attempt("probe", || Err("down"));
        assert_eq!(result, Err("down"));
    }

    #[test]
    fn test_huge_interval_gives_up_without_overflow() {
        let aspects = Aspects {
            action_pattern: ActionPattern::DoUntilSuccess,
            completion_timeout: Duration::MAX,
            completion_interval: Duration::MAX,
            ..Aspects::default()
        };

        let mut calls = 0;
        let result: Result<(), &str> = aspects.attempt("probe", || {
            calls += 1;
            Err("down")
        });

        assert_eq!(result, Err("down"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_accepts_status() {
        let aspects = Aspects {
            allowed_error_codes: vec![3],
            ..Aspects::default()
        };
        assert!(aspects.accepts_status(0));
        assert!(aspects.accepts_status(3));
        assert!(!aspects.accepts_status(1));
    }
}
