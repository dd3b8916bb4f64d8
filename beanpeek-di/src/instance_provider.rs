//! Access to registered component instances.
//!
//! Every registered component is reachable under its concrete type and under each capability
//! (`dyn Trait + Send + Sync`) it declares. Lookups are type-erased at the [TypeId] level and
//! return a [CastInstancePtr], which always holds a `ComponentInstancePtr<T>` for the requested
//! `T`. [TypedComponentInstanceProvider] performs the final, typed downcast.

use crate::component::Injectable;
use crate::error::ComponentInstanceProviderError;
use std::any::{type_name, Any, TypeId};
use std::error::Error;
use std::sync::Arc;

pub type ComponentInstancePtr<T> = Arc<T>;

/// Type-erased pointer to a concrete component instance.
pub type ComponentInstanceAnyPtr = ComponentInstancePtr<dyn Any + Send + Sync + 'static>;

/// Owned component instance, before it gets published in a registry.
pub type ComponentInstanceBox = Box<dyn Any + Send + Sync + 'static>;

/// Type-erased `ComponentInstancePtr<T>`, where `T` is the type used for lookup.
pub type CastInstancePtr = Arc<dyn Any + Send + Sync + 'static>;

/// Error type returned by user code: constructors and lifecycle hooks.
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Converts a raw instance pointer into a [CastInstancePtr] for a specific type. Returns the
/// original pointer on type mismatch.
pub type CastFunction =
    fn(instance: ComponentInstanceAnyPtr) -> Result<CastInstancePtr, ComponentInstanceAnyPtr>;

/// Generic provider for component instances.
pub trait ComponentInstanceProvider {
    /// Returns an instance registered for the given type, if any. Returned pointer holds a
    /// `ComponentInstancePtr<T>` where `TypeId::of::<T>() == type_id`.
    fn instance(&self, type_id: TypeId) -> Option<CastInstancePtr>;

    /// Checks if an instance is available for the given type.
    fn contains(&self, type_id: TypeId) -> bool {
        self.instance(type_id).is_some()
    }
}

/// Helper trait for [ComponentInstanceProvider] providing strongly-typed access.
pub trait TypedComponentInstanceProvider {
    /// Typesafe version of [ComponentInstanceProvider::instance].
    fn instance_typed<T: Injectable + ?Sized>(
        &self,
    ) -> Result<ComponentInstancePtr<T>, ComponentInstanceProviderError>;

    /// Tries to get an instance like [TypedComponentInstanceProvider::instance_typed] does, but
    /// returns `None` on missing instance.
    fn instance_option<T: Injectable + ?Sized>(
        &self,
    ) -> Result<Option<ComponentInstancePtr<T>>, ComponentInstanceProviderError>;
}

impl<CIP: ComponentInstanceProvider + ?Sized> TypedComponentInstanceProvider for CIP {
    fn instance_typed<T: Injectable + ?Sized>(
        &self,
    ) -> Result<ComponentInstancePtr<T>, ComponentInstanceProviderError> {
        self.instance_option::<T>()?
            .ok_or(ComponentInstanceProviderError::NoInstance(type_name::<T>()))
    }

    fn instance_option<T: Injectable + ?Sized>(
        &self,
    ) -> Result<Option<ComponentInstancePtr<T>>, ComponentInstanceProviderError> {
        self.instance(TypeId::of::<T>())
            .map(|instance| downcast_instance::<T>(&instance))
            .transpose()
    }
}

/// Extracts a typed pointer out of a [CastInstancePtr].
pub fn downcast_instance<T: ?Sized + 'static>(
    instance: &CastInstancePtr,
) -> Result<ComponentInstancePtr<T>, ComponentInstanceProviderError> {
    instance
        .downcast_ref::<ComponentInstancePtr<T>>()
        .cloned()
        .ok_or(ComponentInstanceProviderError::IncompatibleComponent(
            type_name::<T>(),
        ))
}

/// [CastFunction] for concrete component types.
pub fn cast_component<T: Any + Send + Sync>(
    instance: ComponentInstanceAnyPtr,
) -> Result<CastInstancePtr, ComponentInstanceAnyPtr> {
    instance
        .downcast::<T>()
        .map(|instance| Arc::new(instance) as CastInstancePtr)
}

/// Wraps an error returned by user code.
pub fn into_error_ptr<E: Error + Send + Sync + 'static>(error: E) -> ErrorPtr {
    Arc::new(error) as ErrorPtr
}

#[cfg(test)]
mod tests {
    use crate::component::Injectable;
    use crate::error::ComponentInstanceProviderError;
    use crate::instance_provider::{
        cast_component, CastInstancePtr, ComponentInstanceAnyPtr, ComponentInstanceProvider,
        ComponentInstancePtr, TypedComponentInstanceProvider,
    };
    use std::any::{type_name, TypeId};

    #[derive(Debug)]
    struct TestComponent(i8);

    impl Injectable for TestComponent {}

    struct SingleInstanceProvider(CastInstancePtr);

    impl ComponentInstanceProvider for SingleInstanceProvider {
        fn instance(&self, type_id: TypeId) -> Option<CastInstancePtr> {
            if type_id == TypeId::of::<TestComponent>() {
                Some(self.0.clone())
            } else {
                None
            }
        }
    }

    #[test]
    fn should_return_typed_instance() {
        let instance = ComponentInstancePtr::new(TestComponent(5)) as ComponentInstanceAnyPtr;
        let provider = SingleInstanceProvider(
            cast_component::<TestComponent>(instance).unwrap_or_else(|_| panic!()),
        );

        assert_eq!(provider.instance_typed::<TestComponent>().unwrap().0, 5);
    }

    #[test]
    fn should_report_missing_instance() {
        struct Empty;

        impl ComponentInstanceProvider for Empty {
            fn instance(&self, _type_id: TypeId) -> Option<CastInstancePtr> {
                None
            }
        }

        assert_eq!(
            Empty.instance_typed::<TestComponent>().unwrap_err(),
            ComponentInstanceProviderError::NoInstance(type_name::<TestComponent>())
        );
        assert!(Empty.instance_option::<TestComponent>().unwrap().is_none());
    }

    #[test]
    fn should_reject_incompatible_instance() {
        let provider = SingleInstanceProvider(ComponentInstancePtr::new(1u8) as CastInstancePtr);

        assert_eq!(
            provider.instance_typed::<TestComponent>().unwrap_err(),
            ComponentInstanceProviderError::IncompatibleComponent(type_name::<TestComponent>())
        );
    }

    #[test]
    fn should_not_cast_foreign_instance() {
        let instance = ComponentInstancePtr::new(1u8) as ComponentInstanceAnyPtr;
        assert!(cast_component::<TestComponent>(instance).is_err());
    }
}
