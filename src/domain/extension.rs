// Copyright (c) 2025 - Cowboy AI, Inc.
//! Device Extensions
//!
//! A [`DeviceExtension`] is the capability bundle a coordinator attaches to a
//! device for one protocol. The coordinator owns it; the extension points
//! back at its device and coordinator through plain handles.

use parking_lot::RwLock;
use serde_json::Value;
use std::any::{type_name, TypeId};
use std::fmt;

use super::device::{DeviceRef, ProtocolFamily};

/// Non-owning handle to a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinatorId {
    type_id: Option<TypeId>,
    name: &'static str,
    protocol: ProtocolFamily,
}

impl CoordinatorId {
    /// A named id not tied to a coordinator type
    pub fn new(name: &'static str, protocol: ProtocolFamily) -> Self {
        Self {
            type_id: None,
            name,
            protocol,
        }
    }

    /// Identity of the coordinator type `C`
    pub fn of<C: 'static>(protocol: ProtocolFamily) -> Self {
        Self {
            type_id: Some(TypeId::of::<C>()),
            name: type_name::<C>(),
            protocol,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn protocol(&self) -> ProtocolFamily {
        self.protocol
    }

    /// Whether this id was produced by [`CoordinatorId::of`] for `C`
    pub fn is<C: 'static>(&self) -> bool {
        self.type_id == Some(TypeId::of::<C>())
    }
}

impl fmt::Display for CoordinatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.protocol)
    }
}

/// Protocol capability attached to a device
#[derive(Debug)]
pub struct DeviceExtension {
    ext_id: String,
    protocol: ProtocolFamily,
    location: String,
    configuration: Value,
    coordinator: CoordinatorId,
    base_device: RwLock<DeviceRef>,
}

impl DeviceExtension {
    pub fn new(
        coordinator: CoordinatorId,
        base_device: DeviceRef,
        ext_id: impl Into<String>,
        location: impl Into<String>,
        configuration: Value,
    ) -> Self {
        Self {
            ext_id: ext_id.into(),
            protocol: coordinator.protocol(),
            location: location.into(),
            configuration,
            coordinator,
            base_device: RwLock::new(base_device),
        }
    }

    pub fn ext_id(&self) -> &str {
        &self.ext_id
    }

    pub fn protocol(&self) -> ProtocolFamily {
        self.protocol
    }

    /// Protocol specific address, e.g. `host:port`
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Protocol configuration fragment taken from the device entry
    pub fn configuration(&self) -> &Value {
        &self.configuration
    }

    pub fn coordinator(&self) -> CoordinatorId {
        self.coordinator
    }

    pub fn base_device(&self) -> DeviceRef {
        self.base_device.read().clone()
    }

    /// Re-point the extension at another device record
    pub fn update_base_device_ref(&self, device: DeviceRef) {
        *self.base_device.write() = device;
    }
}
