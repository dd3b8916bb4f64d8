//! Component instances live in a [ComponentRegistry] - a mapping from declared type to a single
//! instance. Each entry is reachable under its concrete type and under every capability the
//! component declares. Entries are never replaced once stored.
//!
//! Mutation requires `&mut self`, so registration is single-threaded by construction. After
//! initialization, shared references can be used for concurrent lookups.

use crate::catalog::ComponentDescriptor;
use crate::error::RegistryError;
use crate::instance_provider::{CastInstancePtr, ComponentInstanceAnyPtr, ComponentInstanceProvider};
use fxhash::FxHashMap;
use std::any::TypeId;
use std::sync::Arc;

/// A registered component.
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    descriptor: Arc<ComponentDescriptor>,
    instance: ComponentInstanceAnyPtr,
    views: FxHashMap<TypeId, CastInstancePtr>,
    is_proxied: bool,
}

impl RegistryEntry {
    /// Creates an entry from a raw instance and its typed views. The views should include the
    /// concrete type.
    pub fn new(
        descriptor: Arc<ComponentDescriptor>,
        instance: ComponentInstanceAnyPtr,
        views: FxHashMap<TypeId, CastInstancePtr>,
        is_proxied: bool,
    ) -> Self {
        Self {
            descriptor,
            instance,
            views,
            is_proxied,
        }
    }

    #[inline]
    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    /// The underlying concrete instance, never proxied.
    #[inline]
    pub fn instance(&self) -> &ComponentInstanceAnyPtr {
        &self.instance
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.descriptor.type_name
    }

    /// Checks if capability lookups go through a timing proxy.
    #[inline]
    pub fn is_proxied(&self) -> bool {
        self.is_proxied
    }

    #[inline]
    pub fn view(&self, type_id: TypeId) -> Option<&CastInstancePtr> {
        self.views.get(&type_id)
    }

    #[inline]
    pub fn satisfies(&self, type_id: TypeId) -> bool {
        self.views.contains_key(&type_id)
    }
}

/// Registry of singleton component instances, kept in registration order.
#[derive(Clone, Debug, Default)]
pub struct ComponentRegistry {
    entries: Vec<RegistryEntry>,
    index: FxHashMap<TypeId, usize>,
}

impl ComponentRegistry {
    /// Stores a new entry. Existing entries are never overwritten.
    pub fn put(&mut self, entry: RegistryEntry) -> Result<(), RegistryError> {
        let type_id = entry.descriptor.type_id;
        if self.index.contains_key(&type_id) {
            return Err(RegistryError::DuplicateComponent(entry.type_name()));
        }

        self.index.insert(type_id, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Returns the instance registered for the exact type, or the first registered one which
    /// implements the requested capability.
    pub fn get(&self, type_id: TypeId) -> Option<CastInstancePtr> {
        self.entry(type_id)
            .and_then(|entry| entry.view(type_id))
            .cloned()
    }

    /// Returns the entry which would be used to satisfy a lookup of the given type.
    pub fn entry(&self, type_id: TypeId) -> Option<&RegistryEntry> {
        self.index
            .get(&type_id)
            .and_then(|index| self.entries.get(*index))
            .or_else(|| self.entries.iter().find(|entry| entry.satisfies(type_id)))
    }

    /// Checks if the exact concrete type is registered.
    #[inline]
    pub fn is_registered(&self, type_id: TypeId) -> bool {
        self.index.contains_key(&type_id)
    }

    /// All entries in registration order.
    #[inline]
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ComponentInstanceProvider for ComponentRegistry {
    #[inline]
    fn instance(&self, type_id: TypeId) -> Option<CastInstancePtr> {
        self.get(type_id)
    }
}
