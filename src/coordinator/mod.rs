// Copyright (c) 2025 - Cowboy AI, Inc.
//! Device Coordinators
//!
//! A coordinator owns the [`DeviceExtension`]s of one protocol family and
//! keeps track of which declared devices it actually found. There is one
//! coordinator per concrete type in a landscape; the
//! [`CoordinatorRegistry`] enforces that.
//!
//! # Locking
//!
//! Each coordinator guards its pool with its own lock. That lock is never
//! held while resolving a device through the landscape, and the landscape
//! never calls into a coordinator while holding its own lock.

pub mod power;
pub mod reconcile;
pub mod serial;
pub mod ssh;

pub use power::{PowerCoordinator, PowerOutlet};
pub use reconcile::{reconcile, Reconciliation};
pub use serial::{SerialCoordinator, TcpSerialEndpoint};
pub use ssh::SshCoordinator;

use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::coupling::CoordinatorContext;
use crate::domain::{
    CoordinatorId, DeviceExtension, ExtensionRef, LandscapeDevice, ProtocolFamily,
};
use crate::errors::{LandscapeError, LandscapeResult};
use crate::interfaces::DeviceResolver;
use crate::landscape::report::{ConnectivityFailure, ProtocolReport};

/// Device pool state behind the coordinator lock
#[derive(Debug, Default)]
struct DevicePool {
    children: BTreeMap<String, Arc<DeviceExtension>>,
    expected: Vec<String>,
    found: Vec<String>,
    reconciliation: Reconciliation,
}

/// Shared state every coordinator embeds
pub struct CoordinatorCore {
    id: CoordinatorId,
    resolver: Arc<dyn DeviceResolver>,
    pool: Mutex<DevicePool>,
}

impl CoordinatorCore {
    pub fn new(id: CoordinatorId, resolver: Arc<dyn DeviceResolver>) -> Self {
        Self {
            id,
            resolver,
            pool: Mutex::new(DevicePool::default()),
        }
    }

    pub fn id(&self) -> CoordinatorId {
        self.id
    }

    pub fn protocol(&self) -> ProtocolFamily {
        self.id.protocol()
    }

    /// Create an extension for `device`, take ownership of it and point the
    /// device at it. The device becomes expected.
    ///
    /// A previous extension of this coordinator with the same key is
    /// replaced.
    pub fn attach(
        &self,
        device: &LandscapeDevice,
        key: impl Into<String>,
        location: impl Into<String>,
        configuration: serde_json::Value,
    ) -> Arc<DeviceExtension> {
        let key = key.into();
        let extension = Arc::new(DeviceExtension::new(
            self.id,
            device.device_ref(),
            key.clone(),
            location,
            configuration,
        ));

        {
            let mut pool = self.pool.lock();
            if pool.children.insert(key.clone(), Arc::clone(&extension)).is_none() {
                pool.expected.push(key.clone());
            }
        }

        device.attach_extension(
            self.protocol(),
            ExtensionRef {
                coordinator: self.id,
                ext_id: key,
            },
        );
        extension
    }

    /// Extension by key
    pub fn child(&self, key: &str) -> Option<Arc<DeviceExtension>> {
        self.pool.lock().children.get(key).cloned()
    }

    /// Snapshot of the `key → extension` table
    pub fn children(&self) -> BTreeMap<String, Arc<DeviceExtension>> {
        self.pool.lock().children.clone()
    }

    pub fn children_as_extension(&self) -> Vec<Arc<DeviceExtension>> {
        self.pool.lock().children.values().cloned().collect()
    }

    /// Resolve the device behind an extension key
    pub fn lookup_device_by_key(&self, key: &str) -> Option<Arc<LandscapeDevice>> {
        let device = self.pool.lock().children.get(key).map(|e| e.base_device())?;
        self.resolver.resolve(&device)
    }

    pub fn resolver(&self) -> &Arc<dyn DeviceResolver> {
        &self.resolver
    }

    /// Record a device as found; unknown keys are kept for reconciliation
    pub fn record_found(&self, key: impl Into<String>) {
        let key = key.into();
        let mut pool = self.pool.lock();
        if !pool.found.contains(&key) {
            pool.found.push(key);
        }
    }

    /// Take a key back out of the found set
    pub fn forget_found(&self, key: &str) {
        self.pool.lock().found.retain(|k| k != key);
    }

    /// Forget every found key
    pub fn clear_found(&self) {
        self.pool.lock().found.clear();
    }

    pub fn expected(&self) -> Vec<String> {
        self.pool.lock().expected.clone()
    }

    pub fn found(&self) -> Vec<String> {
        self.pool.lock().found.clone()
    }

    pub fn matched(&self) -> Vec<String> {
        self.pool.lock().reconciliation.matched.clone()
    }

    pub fn missing(&self) -> Vec<String> {
        self.pool.lock().reconciliation.missing.clone()
    }

    pub fn unknown(&self) -> Vec<String> {
        self.pool.lock().reconciliation.unknown.clone()
    }

    /// Recompute matched, missing and unknown from expected and found
    pub fn reconcile(&self) -> Reconciliation {
        let mut pool = self.pool.lock();
        let result = reconcile(&pool.expected, &pool.found);
        pool.reconciliation = result.clone();
        debug!(
            coordinator = %self.id,
            matched = result.matched.len(),
            missing = result.missing.len(),
            unknown = result.unknown.len(),
            "reconciled device pool"
        );
        result
    }

    /// Reconcile and render the result as a protocol report
    pub fn report(&self, failures: Vec<ConnectivityFailure>) -> ProtocolReport {
        let result = self.reconcile();
        ProtocolReport {
            matching: result.matched,
            missing: result.missing,
            unknown: result.unknown,
            failures,
        }
    }
}

impl std::fmt::Debug for CoordinatorCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorCore")
            .field("id", &self.id)
            .field("pool", &*self.pool.lock())
            .finish()
    }
}

/// Per-protocol device pool
pub trait Coordinator: Send + Sync + 'static {
    /// One-time construction, run by [`CoordinatorRegistry::get_or_create`]
    fn initialize(ctx: &CoordinatorContext<'_>) -> LandscapeResult<Self>
    where
        Self: Sized;

    fn core(&self) -> &CoordinatorCore;

    fn id(&self) -> CoordinatorId {
        self.core().id()
    }

    /// Discover which expected devices are present
    fn establish_presence(&self) -> LandscapeResult<()> {
        Ok(())
    }

    /// Check every managed device can be talked to
    ///
    /// Failures are accumulated; with `raise_on_error` a non-empty list is
    /// returned as an error instead.
    fn verify_connectivity(
        &self,
        _cmd: &str,
        _user: Option<&str>,
        _raise_on_error: bool,
    ) -> LandscapeResult<Vec<ConnectivityFailure>> {
        Err(LandscapeError::NotOverloaded(format!(
            "{} does not verify connectivity",
            self.id()
        )))
    }

    fn lookup_device_by_key(&self, key: &str) -> Option<Arc<LandscapeDevice>> {
        self.core().lookup_device_by_key(key)
    }

    fn children(&self) -> BTreeMap<String, Arc<DeviceExtension>> {
        self.core().children()
    }

    fn children_as_extension(&self) -> Vec<Arc<DeviceExtension>> {
        self.core().children_as_extension()
    }
}

struct RegisteredCoordinator {
    type_id: TypeId,
    instance: Arc<dyn Any + Send + Sync>,
    coordinator: Arc<dyn Coordinator>,
}

/// One coordinator per concrete type
#[derive(Default)]
pub struct CoordinatorRegistry {
    entries: Mutex<Vec<RegisteredCoordinator>>,
}

impl CoordinatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the coordinator of type `C`, creating it on first request
    pub fn get_or_create<C: Coordinator>(
        &self,
        ctx: &CoordinatorContext<'_>,
    ) -> LandscapeResult<Arc<C>> {
        let mut entries = self.entries.lock();
        if let Some(existing) = Self::find::<C>(&entries) {
            return Ok(existing);
        }

        let created = Arc::new(C::initialize(ctx)?);
        debug!(coordinator = %created.id(), "coordinator created");
        entries.push(RegisteredCoordinator {
            type_id: TypeId::of::<C>(),
            instance: created.clone(),
            coordinator: created.clone(),
        });
        Ok(created)
    }

    pub fn get<C: Coordinator>(&self) -> Option<Arc<C>> {
        Self::find::<C>(&self.entries.lock())
    }

    /// Coordinator an extension reference points at
    pub fn get_by_id(&self, id: &CoordinatorId) -> Option<Arc<dyn Coordinator>> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.coordinator.id() == *id)
            .map(|e| Arc::clone(&e.coordinator))
    }

    /// All coordinators in creation order
    pub fn all(&self) -> Vec<Arc<dyn Coordinator>> {
        self.entries
            .lock()
            .iter()
            .map(|e| Arc::clone(&e.coordinator))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn find<C: Coordinator>(entries: &[RegisteredCoordinator]) -> Option<Arc<C>> {
        entries
            .iter()
            .find(|e| e.type_id == TypeId::of::<C>())
            .and_then(|e| Arc::clone(&e.instance).downcast::<C>().ok())
    }
}

impl std::fmt::Debug for CoordinatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<CoordinatorId> = self.entries.lock().iter().map(|e| e.coordinator.id()).collect();
        f.debug_struct("CoordinatorRegistry").field("coordinators", &ids).finish()
    }
}
