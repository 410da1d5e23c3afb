// Copyright (c) 2025 - Cowboy AI, Inc.
//! Landscape Startup
//!
//! Stands up the landscape declared by the environment and prints the
//! resulting connectivity report as JSON.
//!
//! ## Environment Variables
//!
//! - `LANDSCAPE_FILES`: landscape documents, merged in order
//! - `LANDSCAPE_TOPOLOGY_FILES`: topology documents, merged in order
//! - `LANDSCAPE_OUTPUT_DIRECTORY`: where declared documents are recorded
//! - `LANDSCAPE_LOG_CONFIGURATION`: record the declared documents
//! - `LANDSCAPE_INTERACTIVE`: pretty-print the report
//! - `LANDSCAPE_ALLOW_MISSING_DEVICES` / `LANDSCAPE_ALLOW_UNKNOWN_DEVICES`
//! - `LANDSCAPE_SKIP_FEATURE_VALIDATION` / `LANDSCAPE_SKIP_TOPOLOGY_VALIDATION`
//! - `RUST_LOG`: log filter (default: info)

use anyhow::{Context, Result};
use tracing::{error, info};

use cim_landscape::{
    init_logging, startup_landscape, ActivationParams, Landscape, LandscapeError,
    LandscapeSettings,
};

fn main() -> Result<()> {
    init_logging();

    info!("🚀 Starting landscape");

    let settings = LandscapeSettings::from_env();
    let params = ActivationParams::from_env();
    info!(?params, ?settings, "📋 Settings loaded");

    let landscape = match startup_landscape(&params) {
        Ok(landscape) => landscape,
        Err(err) => {
            if let LandscapeError::Connectivity { report, .. } = &err {
                println!("{}", serde_json::to_string_pretty(report.as_ref())?);
            }
            if let Ok(landscape) = Landscape::singleton() {
                error!(phase = %landscape.phase(), "❌ Landscape activation failed");
            }
            return Err(err).context("Failed to start landscape");
        }
    };

    let report = landscape.connectivity_report().unwrap_or_default();
    let rendered = if settings.interactive {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("Failed to render connectivity report")?;
    println!("{rendered}");

    info!(
        devices = landscape.get_devices()?.len(),
        "✅ Landscape operational"
    );
    Ok(())
}
