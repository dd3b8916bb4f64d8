//! The [ComponentContainer] ties discovery, resolution, lifecycle and lookup together. It's the
//! entry point used by applications:
//!
//! 1. [scan_and_register](ComponentContainer::scan_and_register) discovers components in a
//!    namespace and registers them.
//! 2. [get](ComponentContainer::get) looks up instances by concrete type or capability.
//! 3. [shutdown](ComponentContainer::shutdown) runs pre-destroy hooks once.
//!
//! Registration requires exclusive access to the container, while lookups only need a shared
//! reference and may be performed concurrently once initialization is done.

use crate::catalog::scanner::scan;
use crate::catalog::{ComponentDescriptor, StaticTypeCatalog, TypeCatalog};
use crate::component::Injectable;
use crate::config::ConfigSource;
use crate::error::{
    CatalogError, ContainerError, HookInvocationError, InspectionError,
};
use crate::inspection::{
    component_details, component_names, components_with_tag, grouped_components, method_names,
    ComponentDetails,
};
use crate::instance_provider::{
    CastInstancePtr, ComponentInstanceProvider, ComponentInstancePtr,
    TypedComponentInstanceProvider,
};
use crate::lifecycle::run_pre_destroy;
use crate::registry::ComponentRegistry;
use crate::resolver::{register_all, RegistrationReport};
use std::any::TypeId;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub type TypeCatalogPtr = Box<dyn TypeCatalog + Send + Sync>;

/// Builder for [ComponentContainer] with sensible defaults, for easy construction.
pub struct ComponentContainerBuilder {
    catalog: TypeCatalogPtr,
    config: ConfigSource,
}

impl ComponentContainerBuilder {
    /// Creates a new builder with a [StaticTypeCatalog] and empty configuration.
    pub fn new() -> Result<Self, CatalogError> {
        Ok(Self {
            catalog: Box::new(StaticTypeCatalog::new()?),
            config: ConfigSource::default(),
        })
    }

    /// Sets new [TypeCatalog].
    pub fn with_catalog(mut self, catalog: TypeCatalogPtr) -> Self {
        self.catalog = catalog;
        self
    }

    /// Sets new [ConfigSource] used for config injection.
    pub fn with_config_source(mut self, config: ConfigSource) -> Self {
        self.config = config;
        self
    }

    /// Builds resulting [ComponentContainer].
    pub fn build(self) -> ComponentContainer {
        ComponentContainer::new(self.catalog, self.config)
    }
}

/// Lifecycle state of a [ComponentContainer].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ContainerState {
    /// Nothing registered yet.
    Created,
    /// At least one registration attempt was made.
    Active,
    /// Pre-destroy hooks have run; no further registration is possible.
    ShutDown,
}

/// Outcome of [ComponentContainer::shutdown].
#[derive(Clone, Debug, Default)]
pub struct ShutdownReport {
    /// Number of components whose pre-destroy hooks were run.
    pub destroyed: usize,
    pub hook_failures: Vec<HookInvocationError>,
}

/// Container for managed singleton components.
pub struct ComponentContainer {
    catalog: TypeCatalogPtr,
    config: ConfigSource,
    registry: ComponentRegistry,
    state: ContainerState,
}

impl ComponentContainer {
    pub fn new(catalog: TypeCatalogPtr, config: ConfigSource) -> Self {
        Self {
            catalog,
            config,
            registry: ComponentRegistry::default(),
            state: ContainerState::Created,
        }
    }

    /// Discovers components in the given namespace and registers them. Components from previous
    /// scans are available as dependencies.
    pub fn scan_and_register(
        &mut self,
        namespace: &str,
    ) -> Result<RegistrationReport, ContainerError> {
        self.ensure_not_shut_down()?;

        info!("Scanning namespace: {}", namespace);
        let candidates = scan(&*self.catalog, namespace)?;
        self.register_all(candidates)
    }

    /// Registers the given candidates, resolving dependencies between them and against already
    /// registered components.
    pub fn register_all(
        &mut self,
        candidates: Vec<ComponentDescriptor>,
    ) -> Result<RegistrationReport, ContainerError> {
        self.ensure_not_shut_down()?;

        self.state = ContainerState::Active;
        Ok(register_all(&mut self.registry, &self.config, candidates)?)
    }

    /// Returns the instance registered for `T` - either a concrete component type or a
    /// `dyn Trait + Send + Sync` capability. Absence is a normal outcome.
    pub fn get<T: Injectable + ?Sized>(&self) -> Option<ComponentInstancePtr<T>> {
        match self.registry.instance_option::<T>() {
            Ok(Some(instance)) => Some(instance),
            Ok(None) => {
                warn!("No component registered for: {}", std::any::type_name::<T>());
                None
            }
            Err(error) => {
                warn!("{}", error);
                None
            }
        }
    }

    /// Runs pre-destroy hooks of all registered components. Subsequent calls do nothing.
    pub fn shutdown(&mut self) -> ShutdownReport {
        if self.state == ContainerState::ShutDown {
            debug!("Container already shut down");
            return ShutdownReport::default();
        }

        self.state = ContainerState::ShutDown;
        info!("Shutting down {} component(s)", self.registry.len());

        ShutdownReport {
            destroyed: self.registry.len(),
            hook_failures: run_pre_destroy(self.registry.entries()),
        }
    }

    #[inline]
    pub fn state(&self) -> ContainerState {
        self.state
    }

    #[inline]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    #[inline]
    pub fn config(&self) -> &ConfigSource {
        &self.config
    }

    /// Names of all registered components, in registration order.
    pub fn component_names(&self) -> Vec<String> {
        component_names(&self.registry)
    }

    pub fn method_names(&self, name: &str) -> Result<Vec<String>, InspectionError> {
        method_names(&self.registry, name)
    }

    pub fn component_details(&self, name: &str) -> Result<ComponentDetails, InspectionError> {
        component_details(&self.registry, name)
    }

    /// Component names grouped by the root segment of their namespace.
    pub fn grouped_components(&self) -> BTreeMap<String, Vec<String>> {
        grouped_components(&self.registry)
    }

    pub fn components_with_tag(&self, tag: &str) -> Vec<String> {
        components_with_tag(&self.registry, tag)
    }

    fn ensure_not_shut_down(&self) -> Result<(), ContainerError> {
        if self.state == ContainerState::ShutDown {
            Err(ContainerError::ShutDown)
        } else {
            Ok(())
        }
    }
}

impl ComponentInstanceProvider for ComponentContainer {
    #[inline]
    fn instance(&self, type_id: TypeId) -> Option<CastInstancePtr> {
        self.registry.instance(type_id)
    }
}
