use crate::instance_provider::ErrorPtr;
use itertools::Itertools;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Errors related to retrieving component instances.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum ComponentInstanceProviderError {
    #[error("Cannot find an instance of component: {0}")]
    NoInstance(&'static str),
    #[error("Tried to downcast component to incompatible type: {0}")]
    IncompatibleComponent(&'static str),
}

/// Errors related to building a [TypeCatalog](crate::catalog::TypeCatalog).
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum CatalogError {
    #[error("Attempted to re-register a concrete component type: {0}")]
    DuplicateComponentType(&'static str),
    #[error("Attempted to register capability {capability} twice for: {target_type}")]
    DuplicateCapability {
        capability: &'static str,
        target_type: &'static str,
    },
    #[error("Missing base component {target_type} for: {source_name}")]
    MissingBaseComponent {
        source_name: &'static str,
        target_type: &'static str,
    },
    #[error("Component {0} declares no constructor")]
    MissingConstructor(&'static str),
}

/// Errors related to discovering components in a namespace.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum ScanError {
    #[error("Namespace {0} not found")]
    NamespaceNotFound(String),
    #[error("Invalid namespace: '{0}'")]
    InvalidNamespace(String),
}

/// Errors related to injecting configuration values into component fields.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum ConfigInjectionError {
    #[error("Unsupported config type {type_name} for key: {key}")]
    UnsupportedConfigType {
        key: &'static str,
        type_name: &'static str,
    },
    #[error("Missing config value for key: {0}")]
    ConfigValueMissing(&'static str),
    #[error("Cannot convert value '{value}' of key {key} to {type_name}")]
    InvalidConfigValue {
        key: &'static str,
        value: String,
        type_name: &'static str,
    },
    #[error("Tried to inject configuration into incompatible type: {0}")]
    IncompatibleComponent(&'static str),
}

/// Errors related to loading a [ConfigSource](crate::config::ConfigSource).
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum ConfigSourceError {
    #[error("Failed to load configuration from {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Lifecycle phase of a hook.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum HookPhase {
    PostConstruct,
    PreDestroy,
}

impl Display for HookPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HookPhase::PostConstruct => write!(f, "post-construct"),
            HookPhase::PreDestroy => write!(f, "pre-destroy"),
        }
    }
}

/// A single lifecycle hook failed. Hook failures are isolated - they never abort other hooks or
/// registration.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
#[error("Failed to execute {phase} hook {type_name}.{hook}: {reason}")]
pub struct HookInvocationError {
    pub type_name: &'static str,
    pub hook: &'static str,
    pub phase: HookPhase,
    pub reason: String,
}

/// User code panicked; carries the panic message.
#[derive(Error, Clone, Eq, PartialEq, Hash, Debug)]
#[error("Panicked: {0}")]
pub struct PanicError(pub String);

/// Errors related to the instance registry.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum RegistryError {
    #[error("Component {0} is already registered")]
    DuplicateComponent(&'static str),
}

/// Reason a single component could not be registered.
#[derive(Error, Clone, Debug)]
pub enum ComponentRegistrationError {
    #[error("Could not resolve any constructor for {type_name}, declared: {}", .signatures.iter().join(", "))]
    UnresolvedDependency {
        type_name: &'static str,
        signatures: Vec<String>,
    },
    #[error("Cannot inject configuration into {type_name}: {source}")]
    ConfigInjection {
        type_name: &'static str,
        source: ConfigInjectionError,
    },
    #[error("Error constructing {type_name}: {source}")]
    Construction {
        type_name: &'static str,
        source: ErrorPtr,
    },
    #[error("Error publishing {type_name}: {source}")]
    Instance {
        type_name: &'static str,
        source: ComponentInstanceProviderError,
    },
    #[error("Error storing {type_name}: {source}")]
    Registry {
        type_name: &'static str,
        source: RegistryError,
    },
}

impl ComponentRegistrationError {
    /// Name of the component which failed to register.
    pub fn type_name(&self) -> &'static str {
        match self {
            ComponentRegistrationError::UnresolvedDependency { type_name, .. }
            | ComponentRegistrationError::ConfigInjection { type_name, .. }
            | ComponentRegistrationError::Construction { type_name, .. }
            | ComponentRegistrationError::Instance { type_name, .. }
            | ComponentRegistrationError::Registry { type_name, .. } => *type_name,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, ComponentRegistrationError::UnresolvedDependency { .. })
    }
}

/// Some candidates could not be registered. Components registered before the failure remain
/// available.
#[derive(Error, Clone, Debug)]
#[error("Failed to register components: {}", .failures.iter().map(|failure| failure.type_name()).join(", "))]
pub struct RegistrationError {
    pub failures: Vec<ComponentRegistrationError>,
}

impl RegistrationError {
    /// Names of components stuck on unsatisfiable or cyclic dependencies.
    pub fn unresolved(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.failures
            .iter()
            .filter(|failure| failure.is_unresolved())
            .map(|failure| failure.type_name())
    }
}

/// Errors returned by the [ComponentContainer](crate::container::ComponentContainer).
#[derive(Error, Clone, Debug)]
pub enum ContainerError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("Container has been shut down")]
    ShutDown,
}

/// Errors related to inspecting registered components.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum InspectionError {
    #[error("No such component: {0}")]
    NoSuchComponent(String),
}
