// Copyright (c) 2025 - Cowboy AI, Inc.
//! Landscape Domain Models
//!
//! # Value Objects
//!
//! - [`FriendlyIdentifier`] - validated device identity
//! - [`DeviceRef`] / [`CoordinatorId`] - non-owning handles
//!
//! # Entities
//!
//! - [`LandscapeDevice`] - identity record with one extension slot per protocol
//! - [`DeviceExtension`] - protocol capability owned by a coordinator
//!
//! # Ownership
//!
//! ```text
//! Landscape ──owns──▶ LandscapeDevice ──ExtensionRef──┐
//!                                                      ▼
//! Coordinator ──owns──▶ DeviceExtension ──DeviceRef──▶ (device table key)
//! ```

pub mod device;
pub mod extension;
pub mod filters;
pub mod friendly_id;

pub use device::{DeviceRef, ExtensionRef, LandscapeDevice, ProtocolFamily};
pub use extension::{CoordinatorId, DeviceExtension};
pub use filters::{
    select_device_configs, select_devices, ConfigIncludeFilter, ExcludeDeviceByGroup,
    ExcludeDeviceByName, ExcludeFilter, IncludeDeviceByDeviceType,
    IncludeDeviceByDeviceTypeAndRole, IncludeDeviceByGroup, IncludeDeviceByName,
    IncludeDeviceByRole, IncludeDeviceConfigByDeviceType, IncludeFilter,
};
pub use friendly_id::{FriendlyIdentifier, FriendlyIdentifierError};
