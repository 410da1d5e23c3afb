// Copyright (c) 2025 - Cowboy AI, Inc.
//! Landscape Device Entity
//!
//! A [`LandscapeDevice`] is the identity record for one lab resource. It
//! carries the declared attributes of its configuration entry and one
//! extension reference per protocol family. Extensions themselves are owned
//! by the coordinator that created them; the device only remembers where to
//! find them.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use super::extension::CoordinatorId;
use super::friendly_id::{FriendlyIdentifier, FriendlyIdentifierError};

/// Protocol family an extension speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolFamily {
    Ssh,
    Serial,
    Power,
}

impl ProtocolFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ssh => "ssh",
            Self::Serial => "serial",
            Self::Power => "power",
        }
    }
}

impl fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-owning handle to a device in the landscape device table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceRef(FriendlyIdentifier);

impl DeviceRef {
    pub fn new(identity: FriendlyIdentifier) -> Self {
        Self(identity)
    }

    pub fn identity(&self) -> &FriendlyIdentifier {
        &self.0
    }
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a device's extension for one protocol lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRef {
    pub coordinator: CoordinatorId,
    pub ext_id: String,
}

/// Identity record for one lab resource
///
/// # Invariants
/// - The identity never changes after construction
/// - At most one extension reference per [`ProtocolFamily`]
#[derive(Debug)]
pub struct LandscapeDevice {
    identity: FriendlyIdentifier,
    device_type: String,
    role: Option<String>,
    group: Option<String>,
    features: Vec<String>,
    config: Map<String, Value>,
    extensions: RwLock<BTreeMap<ProtocolFamily, ExtensionRef>>,
}

impl LandscapeDevice {
    /// Build a device record from its configuration entry
    ///
    /// `device_type` is the discriminator value the entry was matched on.
    pub fn from_config(
        device_type: impl Into<String>,
        config: Map<String, Value>,
    ) -> Result<Self, FriendlyIdentifierError> {
        let identity = FriendlyIdentifier::from_config(&config)?;

        let text = |field: &str| config.get(field).and_then(Value::as_str).map(str::to_string);
        let role = text("role");
        let group = text("group");
        let features = config
            .get("features")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            identity,
            device_type: device_type.into(),
            role,
            group,
            features,
            config,
            extensions: RwLock::new(BTreeMap::new()),
        })
    }

    pub fn identity(&self) -> &FriendlyIdentifier {
        &self.identity
    }

    /// Handle other components keep instead of a strong reference
    pub fn device_ref(&self) -> DeviceRef {
        DeviceRef::new(self.identity.clone())
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// The declared configuration entry, unchanged
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// Attach an extension reference, returning the one it replaced
    pub fn attach_extension(
        &self,
        protocol: ProtocolFamily,
        extension: ExtensionRef,
    ) -> Option<ExtensionRef> {
        self.extensions.write().insert(protocol, extension)
    }

    pub fn detach_extension(&self, protocol: ProtocolFamily) -> Option<ExtensionRef> {
        self.extensions.write().remove(&protocol)
    }

    pub fn extension(&self, protocol: ProtocolFamily) -> Option<ExtensionRef> {
        self.extensions.read().get(&protocol).cloned()
    }

    /// Snapshot of every extension reference
    pub fn extensions(&self) -> BTreeMap<ProtocolFamily, ExtensionRef> {
        self.extensions.read().clone()
    }

    /// Copy all extension references of `other` onto this record
    pub fn adopt_extensions(&self, other: &LandscapeDevice) {
        let theirs = other.extensions();
        self.extensions.write().extend(theirs);
    }
}

impl fmt::Display for LandscapeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.identity, self.device_type)
    }
}
