// Copyright (c) 2025 - Cowboy AI, Inc.
//! Lab resource landscape
//!
//! A landscape takes a declared description of lab devices (hosts, serial
//! consoles, power switches and credentials), validates it, and stands up
//! the protocol coordinators that reach those devices. Activation runs in
//! three gated phases: configuration, integration and operations.
//!
//! ```no_run
//! use cim_landscape::{ActivationParams, Landscape};
//!
//! # fn main() -> cim_landscape::LandscapeResult<()> {
//! let landscape = Landscape::singleton()?;
//! landscape.activate_operations(&ActivationParams::from_env())?;
//! for device in landscape.get_devices()? {
//!     println!("{}", device.identity());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Protocol support is pluggable through
//! [`IntegrationCoupling`](coupling::IntegrationCoupling). The builtin
//! couplings cover SSH hosts, TCP serial consoles and DLI power switches.

pub mod aspects;
pub mod config;
pub mod coordinator;
pub mod coupling;
pub mod domain;
pub mod errors;
pub mod gate;
pub mod interfaces;
pub mod landscape;
pub mod logging;
pub mod state_machine;

// Re-export commonly used types
pub use aspects::{ActionPattern, Aspects};
pub use config::{LandscapeConfiguration, LandscapeSettings};
pub use coupling::{CouplingKey, ExtensionPoints, IntegrationCoupling, Precedence, StartupLevel};
pub use domain::{DeviceRef, FriendlyIdentifier, LandscapeDevice, ProtocolFamily};
pub use errors::{LandscapeError, LandscapeResult};
pub use landscape::{
    startup_landscape, ActivationParams, CheckoutRecord, ConnectivityReport, Landscape,
    LandscapeBuilder,
};
pub use logging::init_logging;
pub use state_machine::LandscapePhase;
