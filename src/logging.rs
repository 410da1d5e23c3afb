// Copyright (c) 2025 - Cowboy AI, Inc.
//! Tracing subscriber setup
//!
//! `RUST_LOG` directives apply on top of an `info` default.

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber
///
/// Returns `false` when a subscriber was already installed, which happens
/// when several tests or an embedding application got there first.
pub fn init_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_target(false)
        .try_init()
        .is_ok()
}
