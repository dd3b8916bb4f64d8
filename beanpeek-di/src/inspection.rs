//! Read-only views of registered components, suitable for reporting. All returned data is plain
//! and serializable; no operation here changes the registry.

use crate::catalog::{short_type_name, ComponentDescriptor};
use crate::error::InspectionError;
use crate::registry::{ComponentRegistry, RegistryEntry};
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;

/// Description of a single registered component.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct ComponentDetails {
    pub name: String,
    pub type_name: String,
    pub namespace: String,

    /// Type-level tags, sorted.
    pub tags: Vec<String>,

    pub capabilities: Vec<String>,

    /// Method name to its sorted tag names.
    pub methods: BTreeMap<String, Vec<String>>,

    /// Whether capability lookups go through a timing proxy.
    pub proxied: bool,
}

impl From<&RegistryEntry> for ComponentDetails {
    fn from(entry: &RegistryEntry) -> Self {
        let descriptor = entry.descriptor();

        let mut methods: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for method in &descriptor.methods {
            methods
                .entry(method.name.to_string())
                .or_default()
                .extend(method.tags.iter().map(|tag| tag.to_string()));
        }

        for tags in methods.values_mut() {
            tags.sort();
            tags.dedup();
        }

        Self {
            name: descriptor.name.to_string(),
            type_name: descriptor.type_name.to_string(),
            namespace: descriptor.namespace.to_string(),
            tags: descriptor
                .tags
                .iter()
                .sorted()
                .map(|tag| tag.to_string())
                .collect(),
            capabilities: descriptor
                .capabilities
                .iter()
                .map(|capability| short_type_name(capability.type_name))
                .collect(),
            methods,
            proxied: entry.is_proxied(),
        }
    }
}

/// Names of all registered components, in registration order.
pub fn component_names(registry: &ComponentRegistry) -> Vec<String> {
    registry
        .entries()
        .iter()
        .map(|entry| entry.descriptor().name.to_string())
        .collect()
}

/// Declared method names of a component.
pub fn method_names(
    registry: &ComponentRegistry,
    name: &str,
) -> Result<Vec<String>, InspectionError> {
    find_by_name(registry, name).map(|entry| {
        entry
            .descriptor()
            .methods
            .iter()
            .map(|method| method.name.to_string())
            .unique()
            .collect()
    })
}

pub fn component_details(
    registry: &ComponentRegistry,
    name: &str,
) -> Result<ComponentDetails, InspectionError> {
    find_by_name(registry, name).map(ComponentDetails::from)
}

/// Component names grouped by the root segment of their namespace.
pub fn grouped_components(registry: &ComponentRegistry) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in registry.entries() {
        groups
            .entry(namespace_root(entry.descriptor()).to_string())
            .or_default()
            .push(entry.descriptor().name.to_string());
    }

    groups
}

/// Names of components carrying the given type-level tag.
pub fn components_with_tag(registry: &ComponentRegistry, tag: &str) -> Vec<String> {
    registry
        .entries()
        .iter()
        .filter(|entry| entry.descriptor().has_tag(tag))
        .map(|entry| entry.descriptor().name.to_string())
        .collect()
}

fn find_by_name<'r>(
    registry: &'r ComponentRegistry,
    name: &str,
) -> Result<&'r RegistryEntry, InspectionError> {
    registry
        .entries()
        .iter()
        .find(|entry| entry.descriptor().name == name)
        .ok_or_else(|| InspectionError::NoSuchComponent(name.to_string()))
}

fn namespace_root(descriptor: &ComponentDescriptor) -> &'static str {
    descriptor
        .namespace
        .split("::")
        .next()
        .filter(|root| !root.is_empty())
        .unwrap_or("other")
}
