//! A minimal container for singleton components.
//!
//! Components are discovered by namespace, constructed once their constructor dependencies are
//! available, configured from a flat property source and kept in a registry for lookup by
//! concrete type or by capability trait. Capabilities of components with methods tagged for
//! timed interception are wrapped in proxies which log execution time.
//!
//! ```
//! use beanpeek_di::container::ComponentContainerBuilder;
//! use beanpeek_di::instance_provider::ComponentInstancePtr;
//! use beanpeek_di::Component;
//!
//! #[derive(Component)]
//! struct Repository;
//!
//! #[derive(Component)]
//! struct Service {
//!     repository: ComponentInstancePtr<Repository>,
//! }
//!
//! let mut container = ComponentContainerBuilder::new()
//!     .expect("error creating builder")
//!     .build();
//!
//! container
//!     .scan_and_register(module_path!())
//!     .expect("error registering components");
//!
//! assert!(container.get::<Service>().is_some());
//! ```

extern crate self as beanpeek_di;

pub mod catalog;
pub mod component;
pub mod config;
pub mod container;
pub mod error;
pub mod inspection;
pub mod instance_provider;
pub mod lifecycle;
pub mod proxy;
pub mod registry;
pub mod resolver;

#[cfg(feature = "derive")]
pub use beanpeek_di_derive::{component_alias, component_impl, injectable, Component};
