//! One of the basic blocks of the container is a [Component]. Components are managed objects,
//! which themselves can depend on other components through their constructors.
//!
//! ## Registering concrete components
//!
//! Any type which wants to be managed by the container, needs to implement `Component`. For
//! convenience, the trait can be automatically derived with all infrastructure if the `derive`
//! feature is enabled:
//!
//! ```
//! use beanpeek_di::instance_provider::ComponentInstancePtr;
//! use beanpeek_di::{component_alias, component_impl, injectable, Component};
//!
//! #[injectable]
//! trait Greeter {
//!     fn greet(&self) -> String;
//! }
//!
//! #[derive(Component)]
//! struct HelloService;
//!
//! #[component_alias]
//! impl Greeter for HelloService {
//!     #[log_execution_time]
//!     fn greet(&self) -> String {
//!         "hello".to_string()
//!     }
//! }
//!
//! #[derive(Component)]
//! #[component(tags = ["Demo"])]
//! struct GreetingService {
//!     // dependency injected by the field-wise constructor
//!     greeter: ComponentInstancePtr<dyn Greeter + Send + Sync>,
//!     // value injected from the config source
//!     #[component(config = "welcome.message")]
//!     message: String,
//!     #[component(default)]
//!     counter: i8,
//! }
//!
//! #[component_impl]
//! impl GreetingService {
//!     #[post_construct]
//!     fn init(&self) {}
//!
//!     #[pre_destroy]
//!     fn clean_up(&self) {}
//! }
//! ```
//!
//! ### Supported `#[component]` struct configuration
//!
//! * `tags = ["Tag"]` - additional type-level tags, reported by
//! [inspection](crate::inspection)
//!
//! ### Supported `#[component]` field configuration
//!
//! * `config = "key"` - inject the value of `key` from the
//! [ConfigSource](crate::config::ConfigSource); the field starts as `Default::default()`
//! * `default` - use `Default::default()` initialization
//! * `default = "expr"` - call `expr()` for initialization
//! * `ignore` - leave the field to explicit `#[constructor]`s; no field-wise constructor is
//! generated for such component
//!
//! All remaining fields must be `ComponentInstancePtr<T>` dependencies.
//!
//! ### Constructors and lifecycle hooks
//!
//! `#[component_impl]` placed on an inherent impl block recognizes:
//!
//! * `#[constructor]` - an associated function taking only `ComponentInstancePtr<T>`
//! parameters and returning `Self` or `Result<Self, E>`; when present, declared constructors
//! replace the field-wise one and are tried in declaration order
//! * `#[post_construct]` - `&self` method run right after registration
//! * `#[pre_destroy]` - `&self` method run on container shutdown
//!
//! Hooks may return `()` or `Result<(), E>`.
//!
//! ## Registering capabilities
//!
//! Capabilities are `dyn Trait + Send + Sync` types, which can refer to a concrete component
//! type. Each such trait should be marked with `#[injectable]`, and each implementation with
//! `#[component_alias]`. Methods tagged `#[log_execution_time]` make the container route all
//! capability calls through a [TimingProxy](crate::proxy::TimingProxy).

use crate::catalog::ComponentDescriptor;
use crate::instance_provider::{ComponentInstanceAnyPtr, ComponentInstancePtr};

/// Type-level tag carried by every managed component.
pub const COMPONENT_TAG: &str = "Component";

/// Method tag for constructor variants.
pub const CONSTRUCTOR_TAG: &str = "Constructor";

/// Method tag for post-construct hooks.
pub const POST_CONSTRUCT_TAG: &str = "PostConstruct";

/// Method tag for pre-destroy hooks.
pub const PRE_DESTROY_TAG: &str = "PreDestroy";

/// Method tag for timed interception.
pub const LOG_EXECUTION_TIME_TAG: &str = "LogExecutionTime";

/// Base trait for managed components.
///
/// Please see the module-level documentation for more information.
pub trait Component: ComponentDowncast<Self> + Send + Sync + Sized {
    /// Returns the statically known part of the descriptor for this type. Derived
    /// implementations leave out constructors, hooks and capabilities declared by the other
    /// macros - those get merged by [StaticTypeCatalog](crate::catalog::StaticTypeCatalog).
    fn descriptor() -> ComponentDescriptor;
}

/// Helper trait for traits implemented by components, thus allowing lookup of components based
/// on `dyn Trait` types. The type `C` refers to a concrete component type. Typically
/// automatically derived when using the `#[component_alias]` attribute.
pub trait ComponentDowncast<C: Component>: Injectable {
    fn downcast(
        source: ComponentInstanceAnyPtr,
    ) -> Result<ComponentInstancePtr<Self>, ComponentInstanceAnyPtr>;
}

/// Marker trait for types which can be looked up - components and capabilities.
pub trait Injectable: 'static {}
