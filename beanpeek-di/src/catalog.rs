//! Functionality related to describing managed component types. Descriptors are immutable and
//! derived once per type - usually automatically, from static registrations produced by the
//! derive macros, but they can also be registered manually.

pub mod scanner;

use crate::component::{Component, Injectable, COMPONENT_TAG, LOG_EXECUTION_TIME_TAG};
use crate::error::{CatalogError, ComponentInstanceProviderError, ConfigInjectionError};
use crate::instance_provider::{
    cast_component, downcast_instance, CastFunction, CastInstancePtr, ComponentInstanceAnyPtr,
    ComponentInstanceBox, ComponentInstancePtr, ErrorPtr,
};
use crate::catalog::internal::{
    ComponentAliasDefinition, ComponentAliasRegisterer, ComponentDefinitionRegisterer,
    ComponentImplDefinition, ComponentImplRegisterer,
};
use crate::proxy::InterceptionContext;
use derivative::Derivative;
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
#[cfg(test)]
use mockall::automock;
use std::any::{type_name, Any, TypeId};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Constructs a component from dependencies resolved in parameter order.
pub type ConstructorFunction =
    fn(arguments: &mut ConstructorArguments) -> Result<ComponentInstanceBox, ErrorPtr>;

/// Wraps a component instance as a capability, routing calls through an interception layer.
pub type WrapFunction = fn(
    instance: ComponentInstanceAnyPtr,
    context: InterceptionContext,
) -> Result<CastInstancePtr, ComponentInstanceAnyPtr>;

/// Invokes a lifecycle hook on a component instance.
pub type HookFunction = fn(instance: &(dyn Any + Send + Sync)) -> Result<(), ErrorPtr>;

/// Assigns a raw config value to a field, coercing it to the field type.
pub type InjectFunction = fn(
    instance: &mut (dyn Any + Send + Sync),
    value: Option<&str>,
) -> Result<(), ConfigInjectionError>;

/// A type a constructor depends on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Dependency {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl Dependency {
    pub fn of<T: Injectable + ?Sized>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }
}

impl Display for Dependency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", short_type_name(self.type_name))
    }
}

/// One construction signature of a component.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ConstructorDefinition {
    pub name: &'static str,

    /// Ordered parameter types.
    pub dependencies: Vec<Dependency>,

    #[derivative(Debug = "ignore")]
    pub construct: ConstructorFunction,
}

impl ConstructorDefinition {
    pub fn new(
        name: &'static str,
        dependencies: Vec<Dependency>,
        construct: ConstructorFunction,
    ) -> Self {
        Self {
            name,
            dependencies,
            construct,
        }
    }
}

/// A capability interface implemented by a component.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct CapabilityDefinition {
    pub type_id: TypeId,
    pub type_name: &'static str,

    /// Exposes the instance as the capability directly.
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,

    /// Exposes the instance as the capability behind a timing proxy.
    #[derivative(Debug = "ignore")]
    pub wrap: WrapFunction,

    /// Methods of this capability tagged for timed interception.
    pub timed_methods: Vec<&'static str>,
}

/// A declared method with its tag names.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MethodDefinition {
    pub name: &'static str,
    pub tags: Vec<&'static str>,
}

impl MethodDefinition {
    pub fn new(name: &'static str, tags: Vec<&'static str>) -> Self {
        Self { name, tags }
    }

    #[inline]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| *candidate == tag)
    }
}

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct LifecycleHook {
    pub name: &'static str,

    #[derivative(Debug = "ignore")]
    pub invoke: HookFunction,
}

impl LifecycleHook {
    pub fn new(name: &'static str, invoke: HookFunction) -> Self {
        Self { name, invoke }
    }
}

/// A field which receives a value from the config source.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ConfigPropertyDefinition {
    pub field: &'static str,
    pub key: &'static str,

    #[derivative(Debug = "ignore")]
    pub inject: InjectFunction,
}

impl ConfigPropertyDefinition {
    pub fn new(field: &'static str, key: &'static str, inject: InjectFunction) -> Self {
        Self { field, key, inject }
    }
}

/// Full description of a managed component type.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ComponentDescriptor {
    pub type_id: TypeId,

    /// Short type name used in logs and reports.
    pub type_name: &'static str,

    /// Name used by inspection. Derive-based components have their name generated from type
    /// name by converting it to snake case.
    pub name: &'static str,

    /// Module path declaring the type.
    pub namespace: &'static str,

    /// Type-level tags; always contains [COMPONENT_TAG].
    pub tags: Vec<&'static str>,

    /// Constructor variants in declaration order.
    pub constructors: Vec<ConstructorDefinition>,

    pub capabilities: Vec<CapabilityDefinition>,

    pub methods: Vec<MethodDefinition>,

    pub post_construct: Vec<LifecycleHook>,

    pub pre_destroy: Vec<LifecycleHook>,

    pub config_properties: Vec<ConfigPropertyDefinition>,

    /// Cast function for the concrete type.
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

impl ComponentDescriptor {
    /// Creates an empty descriptor for `T`, to be filled with the `with_*` methods.
    pub fn new<T: Injectable + Send + Sync>(type_name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name,
            name: type_name,
            namespace: "",
            tags: vec![COMPONENT_TAG],
            constructors: vec![],
            capabilities: vec![],
            methods: vec![],
            post_construct: vec![],
            pre_destroy: vec![],
            config_properties: vec![],
            cast: cast_component::<T>,
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_namespace(mut self, namespace: &'static str) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_tag(mut self, tag: &'static str) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn with_constructor(mut self, constructor: ConstructorDefinition) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn with_capability(mut self, capability: CapabilityDefinition) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn with_method(mut self, method: MethodDefinition) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_post_construct(mut self, hook: LifecycleHook) -> Self {
        self.post_construct.push(hook);
        self
    }

    pub fn with_pre_destroy(mut self, hook: LifecycleHook) -> Self {
        self.pre_destroy.push(hook);
        self
    }

    pub fn with_config_property(mut self, property: ConfigPropertyDefinition) -> Self {
        self.config_properties.push(property);
        self
    }

    /// Names of methods tagged for timed interception.
    pub fn timed_methods(&self) -> FxHashSet<&'static str> {
        self.methods
            .iter()
            .filter(|method| method.has_tag(LOG_EXECUTION_TIME_TAG))
            .map(|method| method.name)
            .collect()
    }

    /// Human-readable constructor signatures, e.g. `GreetingService(HelloService)`.
    pub fn signatures(&self) -> Vec<String> {
        self.constructors
            .iter()
            .map(|constructor| {
                format!(
                    "{}({})",
                    self.type_name,
                    constructor.dependencies.iter().join(", ")
                )
            })
            .collect()
    }

    #[inline]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| *candidate == tag)
    }

    fn merge_impl(&mut self, definition: ComponentImplDefinition) {
        if !definition.constructors.is_empty() {
            // explicit constructors replace the field-wise one
            self.constructors = definition.constructors;
        }

        self.methods.extend(definition.methods);
        self.post_construct.extend(definition.post_construct);
        self.pre_destroy.extend(definition.pre_destroy);
    }

    fn merge_alias(&mut self, definition: ComponentAliasDefinition) -> Result<(), CatalogError> {
        if self
            .capabilities
            .iter()
            .any(|capability| capability.type_id == definition.capability.type_id)
        {
            return Err(CatalogError::DuplicateCapability {
                capability: definition.capability.type_name,
                target_type: self.type_name,
            });
        }

        self.capabilities.push(definition.capability);
        self.methods.extend(definition.methods);
        Ok(())
    }
}

/// Arguments passed to a [ConstructorFunction], in parameter order.
pub struct ConstructorArguments {
    arguments: std::vec::IntoIter<CastInstancePtr>,
}

impl ConstructorArguments {
    pub fn new(arguments: Vec<CastInstancePtr>) -> Self {
        Self {
            arguments: arguments.into_iter(),
        }
    }

    /// Takes the next argument as a `ComponentInstancePtr<T>`.
    pub fn next<T: Injectable + ?Sized>(&mut self) -> Result<ComponentInstancePtr<T>, ErrorPtr> {
        let argument = self.arguments.next().ok_or_else(|| {
            Arc::new(ComponentInstanceProviderError::NoInstance(type_name::<T>())) as ErrorPtr
        })?;

        downcast_instance::<T>(&argument).map_err(|error| Arc::new(error) as ErrorPtr)
    }
}

/// Downcasts an instance given to a [HookFunction].
pub fn downcast_component<T: Any>(instance: &(dyn Any + Send + Sync)) -> Result<&T, ErrorPtr> {
    instance.downcast_ref::<T>().ok_or_else(|| {
        Arc::new(ComponentInstanceProviderError::IncompatibleComponent(
            type_name::<T>(),
        )) as ErrorPtr
    })
}

/// Strips module paths from a type name, e.g. `dyn a::b::Trait + Send` becomes
/// `dyn Trait + Send`.
pub fn short_type_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut segment_start = 0;
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            result.truncate(segment_start);
        } else {
            result.push(c);
            if !(c.is_alphanumeric() || c == '_') {
                segment_start = result.len();
            }
        }
    }

    result
}

/// A catalog of component descriptors which can be scanned for candidates.
#[cfg_attr(test, automock)]
pub trait TypeCatalog {
    /// Adds a new descriptor. Fails on duplicate types or descriptors without constructors.
    fn register_component(&mut self, descriptor: ComponentDescriptor) -> Result<(), CatalogError>;

    /// Returns the descriptor for a given type.
    fn descriptor(&self, type_id: TypeId) -> Option<ComponentDescriptor>;

    /// Returns all known descriptors.
    fn descriptors(&self) -> Vec<ComponentDescriptor>;
}

/// Extension for registering [Component] implementations directly.
pub trait TypedTypeCatalog {
    fn register_typed<T: Component>(&mut self) -> Result<(), CatalogError>;
}

impl<TC: TypeCatalog + ?Sized> TypedTypeCatalog for TC {
    #[inline]
    fn register_typed<T: Component>(&mut self) -> Result<(), CatalogError> {
        self.register_component(T::descriptor())
    }
}

/// Catalog of component descriptors initialized from statically registered definitions.
#[derive(Clone, Debug, Default)]
pub struct StaticTypeCatalog {
    descriptors: Vec<ComponentDescriptor>,
    index: FxHashMap<TypeId, usize>,
}

impl StaticTypeCatalog {
    /// Creates a catalog containing every component declared with the derive macros.
    pub fn new() -> Result<Self, CatalogError> {
        let mut descriptors: FxHashMap<TypeId, ComponentDescriptor> = FxHashMap::default();

        for registerer in inventory::iter::<ComponentDefinitionRegisterer> {
            let descriptor = (registerer.register)();
            if descriptors.contains_key(&descriptor.type_id) {
                return Err(CatalogError::DuplicateComponentType(descriptor.type_name));
            }

            descriptors.insert(descriptor.type_id, descriptor);
        }

        for registerer in inventory::iter::<ComponentImplRegisterer> {
            let definition = (registerer.register)();
            descriptors
                .get_mut(&definition.target)
                .ok_or(CatalogError::MissingBaseComponent {
                    source_name: "component_impl",
                    target_type: definition.target_name,
                })?
                .merge_impl(definition);
        }

        for registerer in inventory::iter::<ComponentAliasRegisterer> {
            let definition = (registerer.register)();
            descriptors
                .get_mut(&definition.target)
                .ok_or(CatalogError::MissingBaseComponent {
                    source_name: definition.capability.type_name,
                    target_type: definition.target_name,
                })?
                .merge_alias(definition)?;
        }

        let mut catalog = Self::default();
        for descriptor in descriptors
            .into_values()
            .sorted_by_key(|descriptor| (descriptor.namespace, descriptor.type_name))
        {
            catalog.register_component(descriptor)?;
        }

        Ok(catalog)
    }
}

impl TypeCatalog for StaticTypeCatalog {
    fn register_component(&mut self, descriptor: ComponentDescriptor) -> Result<(), CatalogError> {
        if self.index.contains_key(&descriptor.type_id) {
            return Err(CatalogError::DuplicateComponentType(descriptor.type_name));
        }

        if descriptor.constructors.is_empty() {
            return Err(CatalogError::MissingConstructor(descriptor.type_name));
        }

        self.index
            .insert(descriptor.type_id, self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    #[inline]
    fn descriptor(&self, type_id: TypeId) -> Option<ComponentDescriptor> {
        self.index
            .get(&type_id)
            .and_then(|index| self.descriptors.get(*index))
            .cloned()
    }

    #[inline]
    fn descriptors(&self) -> Vec<ComponentDescriptor> {
        self.descriptors.clone()
    }
}

#[doc(hidden)]
pub mod internal {
    use crate::catalog::{
        CapabilityDefinition, ComponentDescriptor, ConstructorDefinition, LifecycleHook,
        MethodDefinition,
    };
    use inventory::collect;
    pub use inventory::submit;
    use std::any::TypeId;

    pub struct ComponentDefinitionRegisterer {
        pub register: fn() -> ComponentDescriptor,
    }

    /// Part of a descriptor declared on an inherent impl block.
    #[derive(Clone)]
    pub struct ComponentImplDefinition {
        pub target: TypeId,
        pub target_name: &'static str,
        pub constructors: Vec<ConstructorDefinition>,
        pub methods: Vec<MethodDefinition>,
        pub post_construct: Vec<LifecycleHook>,
        pub pre_destroy: Vec<LifecycleHook>,
    }

    pub struct ComponentImplRegisterer {
        pub register: fn() -> ComponentImplDefinition,
    }

    /// Part of a descriptor declared on a capability implementation.
    #[derive(Clone)]
    pub struct ComponentAliasDefinition {
        pub target: TypeId,
        pub target_name: &'static str,
        pub capability: CapabilityDefinition,
        pub methods: Vec<MethodDefinition>,
    }

    pub struct ComponentAliasRegisterer {
        pub register: fn() -> ComponentAliasDefinition,
    }

    collect!(ComponentDefinitionRegisterer);
    collect!(ComponentImplRegisterer);
    collect!(ComponentAliasRegisterer);
}
