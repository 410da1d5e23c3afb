// Copyright (c) 2025 - Cowboy AI, Inc.
//! Coupling registration
//!
//! Couplings are registered explicitly. An [`ExtensionPoints`] chain holds
//! factories in registration order; resolving it produces the installed
//! [`CouplingRegistry`] of one landscape.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{sort_by_precedence, IntegrationCoupling, PowerCoupling, SerialCoupling, SshCoupling};
use crate::errors::{LandscapeError, LandscapeResult};

/// Installed couplings indexed by composite key
#[derive(Default, Clone)]
pub struct CouplingRegistry {
    couplings: Vec<Arc<dyn IntegrationCoupling>>,
    index: BTreeMap<String, usize>,
}

impl CouplingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a coupling; a second coupling with the same key is rejected
    pub fn register(&mut self, coupling: Arc<dyn IntegrationCoupling>) -> LandscapeResult<()> {
        let key = coupling.key().to_string();
        if self.index.contains_key(&key) {
            return Err(LandscapeError::Semantic(format!(
                "an integration coupling is already registered for '{key}'"
            )));
        }

        self.index.insert(key, self.couplings.len());
        self.couplings.push(coupling);
        Ok(())
    }

    /// Install a coupling, replacing any coupling with the same key
    ///
    /// The replacement keeps the registration slot of the coupling it
    /// replaces.
    pub fn replace(
        &mut self,
        coupling: Arc<dyn IntegrationCoupling>,
    ) -> Option<Arc<dyn IntegrationCoupling>> {
        let key = coupling.key().to_string();
        match self.index.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.couplings[slot], coupling)),
            None => {
                self.index.insert(key, self.couplings.len());
                self.couplings.push(coupling);
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn IntegrationCoupling>> {
        self.index.get(key).map(|&slot| Arc::clone(&self.couplings[slot]))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }

    /// Couplings in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn IntegrationCoupling>> {
        self.couplings.iter()
    }

    /// Couplings claiming items of `section`
    pub fn in_section(&self, section: &str) -> Vec<Arc<dyn IntegrationCoupling>> {
        self.couplings
            .iter()
            .filter(|c| c.section() == section)
            .cloned()
            .collect()
    }

    /// Couplings in activation order
    pub fn by_precedence(&self) -> Vec<Arc<dyn IntegrationCoupling>> {
        let mut ordered = self.couplings.clone();
        sort_by_precedence(&mut ordered);
        ordered
    }

    pub fn len(&self) -> usize {
        self.couplings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.couplings.is_empty()
    }
}

impl fmt::Debug for CouplingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CouplingRegistry")
            .field("keys", &self.index.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Produces fresh coupling instances for a landscape
pub trait CouplingFactory: Send + Sync {
    fn name(&self) -> &str;

    fn couplings(&self) -> Vec<Arc<dyn IntegrationCoupling>>;
}

type CouplingFn = dyn Fn() -> Vec<Arc<dyn IntegrationCoupling>> + Send + Sync;

/// Factory backed by a closure
pub struct FnCouplingFactory {
    name: String,
    make: Box<CouplingFn>,
}

impl FnCouplingFactory {
    pub fn new<F>(name: impl Into<String>, make: F) -> Self
    where
        F: Fn() -> Vec<Arc<dyn IntegrationCoupling>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            make: Box::new(make),
        }
    }
}

impl CouplingFactory for FnCouplingFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn couplings(&self) -> Vec<Arc<dyn IntegrationCoupling>> {
        (self.make)()
    }
}

/// SSH, TCP serial and DLI power couplings
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCouplings;

impl CouplingFactory for BuiltinCouplings {
    fn name(&self) -> &str {
        "builtin"
    }

    fn couplings(&self) -> Vec<Arc<dyn IntegrationCoupling>> {
        vec![
            Arc::new(SshCoupling::new()),
            Arc::new(SerialCoupling::new()),
            Arc::new(PowerCoupling::new()),
        ]
    }
}

/// Ordered chain of coupling factories
#[derive(Clone, Default)]
pub struct ExtensionPoints {
    factories: Vec<Arc<dyn CouplingFactory>>,
}

impl ExtensionPoints {
    /// An empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain holding the builtin couplings
    pub fn builtin() -> Self {
        Self::new().with_factory(BuiltinCouplings)
    }

    pub fn with_factory(mut self, factory: impl CouplingFactory + 'static) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }

    pub fn register_factory(&mut self, factory: Arc<dyn CouplingFactory>) {
        self.factories.push(factory);
    }

    pub fn factory_names(&self) -> Vec<&str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    /// Build the installed coupling table
    ///
    /// A duplicate key inside one factory is an error. A later factory
    /// providing a key an earlier factory provided replaces it.
    pub fn resolve(&self) -> LandscapeResult<CouplingRegistry> {
        let mut installed = CouplingRegistry::new();

        for factory in &self.factories {
            let mut local = CouplingRegistry::new();
            for coupling in factory.couplings() {
                local.register(coupling).map_err(|err| {
                    LandscapeError::Semantic(format!("factory '{}': {err}", factory.name()))
                })?;
            }

            for coupling in local.iter() {
                let key = coupling.key();
                if installed.replace(Arc::clone(coupling)).is_some() {
                    warn!(%key, factory = factory.name(), "integration coupling overridden");
                } else {
                    debug!(%key, factory = factory.name(), "integration coupling installed");
                }
            }
        }

        Ok(installed)
    }
}

impl fmt::Debug for ExtensionPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionPoints")
            .field("factories", &self.factory_names())
            .finish()
    }
}
