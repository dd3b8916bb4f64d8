//! Dependency resolution for candidate components.
//!
//! Candidates are registered by repeated passes over the pending set. In each pass, a candidate
//! is constructed using the first constructor variant whose dependencies are all present in the
//! [ComponentRegistry]. Resolution stops when every candidate has been handled, or when a full
//! pass makes no progress - the remaining candidates have unsatisfiable or cyclic dependencies
//! and are reported as unresolved. Candidate order only affects the number of passes.
//!
//! A single registration consists of: construction, config injection, wrapping capabilities in
//! [timing proxies](crate::proxy), publishing in the registry and running post-construct hooks.
//! Failure of any step before publishing, including a panicking constructor, aborts registration
//! of that candidate only.

use crate::catalog::{ComponentDescriptor, ConstructorArguments, ConstructorDefinition};
use crate::config::{inject, ConfigSource};
use crate::error::{
    ComponentRegistrationError, HookInvocationError, PanicError, RegistrationError,
};
use crate::instance_provider::{
    into_error_ptr, CastInstancePtr, ComponentInstanceAnyPtr, ComponentInstanceBox, ErrorPtr,
};
use crate::lifecycle::{panic_message, run_post_construct};
use crate::proxy::{wrap_if_needed, ComponentViews};
use crate::registry::{ComponentRegistry, RegistryEntry};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Summary of a fully successful registration.
#[derive(Clone, Debug, Default)]
pub struct RegistrationReport {
    /// Newly registered components, in registration order.
    pub registered: Vec<&'static str>,

    /// Post-construct hooks which failed. Such failures don't abort registration.
    pub hook_failures: Vec<HookInvocationError>,
}

struct ConstructionPlan<'d> {
    constructor: &'d ConstructorDefinition,
    arguments: Vec<CastInstancePtr>,
}

/// Registers all candidates which can be resolved. Components already present in the registry
/// are skipped. On failure, components registered so far remain in the registry.
pub fn register_all(
    registry: &mut ComponentRegistry,
    config: &ConfigSource,
    candidates: Vec<ComponentDescriptor>,
) -> Result<RegistrationReport, RegistrationError> {
    let mut pending: Vec<Arc<ComponentDescriptor>> =
        candidates.into_iter().map(Arc::new).collect();
    let mut report = RegistrationReport::default();
    let mut failures = vec![];
    let mut pass = 0;

    while !pending.is_empty() {
        pass += 1;
        debug!("Resolution pass {} over {} candidate(s)", pass, pending.len());

        let mut progress = false;
        let mut remaining = Vec::with_capacity(pending.len());

        for descriptor in pending {
            if registry.is_registered(descriptor.type_id) {
                debug!("Component {} is already registered", descriptor.type_name);
                progress = true;
                continue;
            }

            let Some(plan) = plan_construction(registry, &descriptor) else {
                remaining.push(descriptor);
                continue;
            };

            progress = true;
            match register(registry, config, &descriptor, plan) {
                Ok(hook_failures) => {
                    report.registered.push(descriptor.type_name);
                    report.hook_failures.extend(hook_failures);
                }
                Err(error) => {
                    warn!("{}", error);
                    failures.push(error);
                }
            }
        }

        pending = remaining;
        if !progress {
            break;
        }
    }

    for descriptor in pending {
        let signatures = descriptor.signatures();
        warn!(
            "Cannot resolve dependencies for {}, declared constructors: {}",
            descriptor.type_name,
            signatures.join(", ")
        );

        failures.push(ComponentRegistrationError::UnresolvedDependency {
            type_name: descriptor.type_name,
            signatures,
        });
    }

    if failures.is_empty() {
        Ok(report)
    } else {
        Err(RegistrationError { failures })
    }
}

/// Selects the first constructor whose every dependency is available and fetches the
/// dependencies in parameter order.
fn plan_construction<'d>(
    registry: &ComponentRegistry,
    descriptor: &'d ComponentDescriptor,
) -> Option<ConstructionPlan<'d>> {
    descriptor.constructors.iter().find_map(|constructor| {
        constructor
            .dependencies
            .iter()
            .map(|dependency| registry.get(dependency.type_id))
            .collect::<Option<Vec<_>>>()
            .map(|arguments| ConstructionPlan {
                constructor,
                arguments,
            })
    })
}

fn construct(plan: ConstructionPlan) -> Result<ComponentInstanceBox, ErrorPtr> {
    let construct = plan.constructor.construct;
    let mut arguments = ConstructorArguments::new(plan.arguments);

    catch_unwind(AssertUnwindSafe(|| construct(&mut arguments))).unwrap_or_else(|payload| {
        Err(into_error_ptr(PanicError(panic_message(payload.as_ref()))))
    })
}

fn register(
    registry: &mut ComponentRegistry,
    config: &ConfigSource,
    descriptor: &Arc<ComponentDescriptor>,
    plan: ConstructionPlan,
) -> Result<Vec<HookInvocationError>, ComponentRegistrationError> {
    let type_name = descriptor.type_name;
    debug!("Constructing {} using {}", type_name, plan.constructor.name);

    let mut instance = construct(plan)
        .map_err(|source| ComponentRegistrationError::Construction { type_name, source })?;

    inject(descriptor, instance.as_mut(), config)
        .map_err(|source| ComponentRegistrationError::ConfigInjection { type_name, source })?;

    let instance: ComponentInstanceAnyPtr = Arc::from(instance);
    let ComponentViews { views, is_proxied } = wrap_if_needed(descriptor, &instance)
        .map_err(|source| ComponentRegistrationError::Instance { type_name, source })?;

    registry
        .put(RegistryEntry::new(
            descriptor.clone(),
            instance,
            views,
            is_proxied,
        ))
        .map_err(|source| ComponentRegistrationError::Registry { type_name, source })?;

    info!("Registered component: {}", type_name);

    Ok(registry
        .entry(descriptor.type_id)
        .map(run_post_construct)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use crate::catalog::{
        downcast_component, ComponentDescriptor, ConfigPropertyDefinition, ConstructorArguments,
        ConstructorDefinition, Dependency, LifecycleHook,
    };
    use crate::component::Injectable;
    use crate::config::{coerce_property, ConfigSource};
    use crate::error::{ComponentRegistrationError, ConfigInjectionError};
    use crate::instance_provider::{
        into_error_ptr, ComponentInstanceBox, ComponentInstancePtr, ErrorPtr,
        TypedComponentInstanceProvider,
    };
    use crate::registry::ComponentRegistry;
    use crate::resolver::register_all;
    use std::any::Any;
    use std::io::{Error, ErrorKind};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct ServiceA;

    impl Injectable for ServiceA {}

    struct ServiceB {
        a: ComponentInstancePtr<ServiceA>,
    }

    impl Injectable for ServiceB {}

    struct ServiceC {
        b: ComponentInstancePtr<ServiceB>,
    }

    impl Injectable for ServiceC {}

    struct ServiceX;

    impl Injectable for ServiceX {}

    struct ServiceY;

    impl Injectable for ServiceY {}

    struct MultiConstructorService {
        constructor: &'static str,
    }

    impl Injectable for MultiConstructorService {}

    #[derive(Default)]
    struct HookedService {
        initialized: AtomicBool,
    }

    impl Injectable for HookedService {}

    #[derive(Default)]
    struct ConfiguredService {
        port: i32,
    }

    impl Injectable for ConfiguredService {}

    fn construct_a(_arguments: &mut ConstructorArguments) -> Result<ComponentInstanceBox, ErrorPtr> {
        Ok(Box::new(ServiceA))
    }

    fn construct_b(arguments: &mut ConstructorArguments) -> Result<ComponentInstanceBox, ErrorPtr> {
        Ok(Box::new(ServiceB {
            a: arguments.next()?,
        }))
    }

    fn construct_c(arguments: &mut ConstructorArguments) -> Result<ComponentInstanceBox, ErrorPtr> {
        Ok(Box::new(ServiceC {
            b: arguments.next()?,
        }))
    }

    fn construct_x(arguments: &mut ConstructorArguments) -> Result<ComponentInstanceBox, ErrorPtr> {
        arguments.next::<ServiceY>()?;
        Ok(Box::new(ServiceX))
    }

    fn construct_y(arguments: &mut ConstructorArguments) -> Result<ComponentInstanceBox, ErrorPtr> {
        arguments.next::<ServiceX>()?;
        Ok(Box::new(ServiceY))
    }

    fn construct_failing(
        _arguments: &mut ConstructorArguments,
    ) -> Result<ComponentInstanceBox, ErrorPtr> {
        Err(into_error_ptr(Error::new(ErrorKind::Other, "broken")))
    }

    fn construct_panicking(
        _arguments: &mut ConstructorArguments,
    ) -> Result<ComponentInstanceBox, ErrorPtr> {
        panic!("constructor blew up");
    }

    fn construct_multi_missing(
        arguments: &mut ConstructorArguments,
    ) -> Result<ComponentInstanceBox, ErrorPtr> {
        arguments.next::<ServiceX>()?;
        Ok(Box::new(MultiConstructorService {
            constructor: "with_x",
        }))
    }

    fn construct_multi_available(
        arguments: &mut ConstructorArguments,
    ) -> Result<ComponentInstanceBox, ErrorPtr> {
        arguments.next::<ServiceA>()?;
        Ok(Box::new(MultiConstructorService {
            constructor: "with_a",
        }))
    }

    fn construct_hooked(
        _arguments: &mut ConstructorArguments,
    ) -> Result<ComponentInstanceBox, ErrorPtr> {
        Ok(Box::<HookedService>::default())
    }

    fn init_hooked(instance: &(dyn Any + Send + Sync)) -> Result<(), ErrorPtr> {
        downcast_component::<HookedService>(instance)?
            .initialized
            .store(true, Ordering::SeqCst);
        Ok(())
    }

    fn construct_configured(
        _arguments: &mut ConstructorArguments,
    ) -> Result<ComponentInstanceBox, ErrorPtr> {
        Ok(Box::<ConfiguredService>::default())
    }

    fn inject_port(
        instance: &mut (dyn Any + Send + Sync),
        value: Option<&str>,
    ) -> Result<(), ConfigInjectionError> {
        instance
            .downcast_mut::<ConfiguredService>()
            .ok_or(ConfigInjectionError::IncompatibleComponent("ConfiguredService"))?
            .port = coerce_property("server.port", value)?;
        Ok(())
    }

    fn descriptor_a() -> ComponentDescriptor {
        ComponentDescriptor::new::<ServiceA>("ServiceA")
            .with_constructor(ConstructorDefinition::new("new", vec![], construct_a))
    }

    fn descriptor_b() -> ComponentDescriptor {
        ComponentDescriptor::new::<ServiceB>("ServiceB").with_constructor(
            ConstructorDefinition::new("new", vec![Dependency::of::<ServiceA>()], construct_b),
        )
    }

    fn descriptor_c() -> ComponentDescriptor {
        ComponentDescriptor::new::<ServiceC>("ServiceC").with_constructor(
            ConstructorDefinition::new("new", vec![Dependency::of::<ServiceB>()], construct_c),
        )
    }

    fn cycle() -> Vec<ComponentDescriptor> {
        vec![
            ComponentDescriptor::new::<ServiceX>("ServiceX").with_constructor(
                ConstructorDefinition::new("new", vec![Dependency::of::<ServiceY>()], construct_x),
            ),
            ComponentDescriptor::new::<ServiceY>("ServiceY").with_constructor(
                ConstructorDefinition::new("new", vec![Dependency::of::<ServiceX>()], construct_y),
            ),
        ]
    }

    #[test]
    fn should_register_regardless_of_order() {
        let mut registry = ComponentRegistry::default();
        let report = register_all(
            &mut registry,
            &ConfigSource::default(),
            vec![descriptor_c(), descriptor_b(), descriptor_a()],
        )
        .unwrap();

        assert_eq!(report.registered, vec!["ServiceA", "ServiceB", "ServiceC"]);

        let a = registry.instance_typed::<ServiceA>().unwrap();
        let c = registry.instance_typed::<ServiceC>().unwrap();
        assert!(Arc::ptr_eq(&c.b.a, &a));
    }

    #[test]
    fn should_report_cycle_as_unresolved() {
        let mut registry = ComponentRegistry::default();
        let mut candidates = cycle();
        candidates.push(descriptor_a());

        let error = register_all(&mut registry, &ConfigSource::default(), candidates).unwrap_err();

        assert_eq!(
            error.unresolved().collect::<Vec<_>>(),
            vec!["ServiceX", "ServiceY"]
        );
        assert!(matches!(
            &error.failures[0],
            ComponentRegistrationError::UnresolvedDependency { signatures, .. }
                if signatures == &vec!["ServiceX(ServiceY)".to_string()]
        ));

        // partial success
        assert!(registry.instance_typed::<ServiceA>().is_ok());
        assert!(registry.instance_typed::<ServiceX>().is_err());
    }

    #[test]
    fn should_report_self_dependency_as_unresolved() {
        let mut registry = ComponentRegistry::default();
        let descriptor = ComponentDescriptor::new::<ServiceX>("ServiceX").with_constructor(
            ConstructorDefinition::new("new", vec![Dependency::of::<ServiceX>()], construct_a),
        );

        let error =
            register_all(&mut registry, &ConfigSource::default(), vec![descriptor]).unwrap_err();
        assert_eq!(error.unresolved().collect::<Vec<_>>(), vec!["ServiceX"]);
        assert!(registry.is_empty());
    }

    #[test]
    fn should_select_first_satisfiable_constructor() {
        let mut registry = ComponentRegistry::default();
        let descriptor = ComponentDescriptor::new::<MultiConstructorService>(
            "MultiConstructorService",
        )
        .with_constructor(ConstructorDefinition::new(
            "with_x",
            vec![Dependency::of::<ServiceX>()],
            construct_multi_missing,
        ))
        .with_constructor(ConstructorDefinition::new(
            "with_a",
            vec![Dependency::of::<ServiceA>()],
            construct_multi_available,
        ));

        register_all(
            &mut registry,
            &ConfigSource::default(),
            vec![descriptor, descriptor_a()],
        )
        .unwrap();

        assert_eq!(
            registry
                .instance_typed::<MultiConstructorService>()
                .unwrap()
                .constructor,
            "with_a"
        );
    }

    #[test]
    fn should_skip_registered_components() {
        let mut registry = ComponentRegistry::default();
        let config = ConfigSource::default();

        register_all(&mut registry, &config, vec![descriptor_a()]).unwrap();
        let original = registry.instance_typed::<ServiceA>().unwrap();

        let report = register_all(&mut registry, &config, vec![descriptor_a(), descriptor_b()])
            .unwrap();

        assert_eq!(report.registered, vec!["ServiceB"]);
        assert_eq!(registry.len(), 2);
        assert!(Arc::ptr_eq(
            &original,
            &registry.instance_typed::<ServiceA>().unwrap()
        ));
    }

    #[test]
    fn should_report_construction_error() {
        let mut registry = ComponentRegistry::default();
        let failing = ComponentDescriptor::new::<ServiceA>("ServiceA")
            .with_constructor(ConstructorDefinition::new("new", vec![], construct_failing));

        let error = register_all(
            &mut registry,
            &ConfigSource::default(),
            vec![failing, descriptor_b()],
        )
        .unwrap_err();

        assert_eq!(error.failures.len(), 2);
        assert!(matches!(
            &error.failures[0],
            ComponentRegistrationError::Construction {
                type_name: "ServiceA",
                ..
            }
        ));
        assert_eq!(error.unresolved().collect::<Vec<_>>(), vec!["ServiceB"]);
    }

    #[test]
    fn should_isolate_panicking_constructor() {
        let mut registry = ComponentRegistry::default();
        let panicking = ComponentDescriptor::new::<ServiceX>("ServiceX")
            .with_constructor(ConstructorDefinition::new("new", vec![], construct_panicking));

        let error = register_all(
            &mut registry,
            &ConfigSource::default(),
            vec![panicking, descriptor_a()],
        )
        .unwrap_err();

        assert_eq!(error.failures.len(), 1);
        let ComponentRegistrationError::Construction { type_name, source } = &error.failures[0]
        else {
            panic!("unexpected failure: {}", error.failures[0]);
        };
        assert_eq!(*type_name, "ServiceX");
        assert!(source.to_string().contains("constructor blew up"));
        assert!(registry.instance_typed::<ServiceA>().is_ok());
        assert!(registry.instance_typed::<ServiceX>().is_err());
    }

    #[test]
    fn should_run_post_construct_after_registration() {
        let mut registry = ComponentRegistry::default();
        let descriptor = ComponentDescriptor::new::<HookedService>("HookedService")
            .with_constructor(ConstructorDefinition::new("new", vec![], construct_hooked))
            .with_post_construct(LifecycleHook::new("init", init_hooked));

        let report =
            register_all(&mut registry, &ConfigSource::default(), vec![descriptor]).unwrap();

        assert!(report.hook_failures.is_empty());
        assert!(registry
            .instance_typed::<HookedService>()
            .unwrap()
            .initialized
            .load(Ordering::SeqCst));
    }

    fn configured_descriptor() -> ComponentDescriptor {
        ComponentDescriptor::new::<ConfiguredService>("ConfiguredService")
            .with_constructor(ConstructorDefinition::new(
                "new",
                vec![],
                construct_configured,
            ))
            .with_config_property(ConfigPropertyDefinition::new(
                "port",
                "server.port",
                inject_port,
            ))
    }

    #[test]
    fn should_inject_config_before_publishing() {
        let mut registry = ComponentRegistry::default();
        let config: ConfigSource = [("server.port", "8080")].into_iter().collect();

        register_all(&mut registry, &config, vec![configured_descriptor()]).unwrap();

        assert_eq!(
            registry
                .instance_typed::<ConfiguredService>()
                .unwrap()
                .port,
            8080
        );
    }

    #[test]
    fn should_abort_registration_on_missing_config() {
        let mut registry = ComponentRegistry::default();

        let error = register_all(
            &mut registry,
            &ConfigSource::default(),
            vec![configured_descriptor()],
        )
        .unwrap_err();

        assert!(matches!(
            &error.failures[0],
            ComponentRegistrationError::ConfigInjection {
                source: ConfigInjectionError::ConfigValueMissing("server.port"),
                ..
            }
        ));
        assert!(registry.is_empty());
    }
}
