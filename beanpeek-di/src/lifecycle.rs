//! Invocation of post-construct and pre-destroy hooks.
//!
//! Each hook runs in isolation: an error or a panic is logged and reported, but never stops the
//! remaining hooks of the same component or of other components.

use crate::catalog::LifecycleHook;
use crate::error::{HookInvocationError, HookPhase};
use crate::registry::RegistryEntry;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, info};

/// Runs post-construct hooks of a freshly registered component, in declaration order.
pub fn run_post_construct(entry: &RegistryEntry) -> Vec<HookInvocationError> {
    run_hooks(entry, &entry.descriptor().post_construct, HookPhase::PostConstruct)
}

/// Runs pre-destroy hooks of all given entries. Entries are visited in reverse order, so
/// components are destroyed before their dependencies; hooks of a single component run in
/// declaration order.
pub fn run_pre_destroy(entries: &[RegistryEntry]) -> Vec<HookInvocationError> {
    entries
        .iter()
        .rev()
        .flat_map(|entry| run_hooks(entry, &entry.descriptor().pre_destroy, HookPhase::PreDestroy))
        .collect()
}

fn run_hooks(
    entry: &RegistryEntry,
    hooks: &[LifecycleHook],
    phase: HookPhase,
) -> Vec<HookInvocationError> {
    hooks
        .iter()
        .filter_map(|hook| invoke_hook(entry, hook, phase).err())
        .collect()
}

fn invoke_hook(
    entry: &RegistryEntry,
    hook: &LifecycleHook,
    phase: HookPhase,
) -> Result<(), HookInvocationError> {
    let instance: &(dyn Any + Send + Sync) = entry.instance().as_ref();
    let result = catch_unwind(AssertUnwindSafe(|| (hook.invoke)(instance)));

    let reason = match result {
        Ok(Ok(())) => {
            info!("Executed {} hook: {}.{}", phase, entry.type_name(), hook.name);
            return Ok(());
        }
        Ok(Err(error)) => error.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };

    let error = HookInvocationError {
        type_name: entry.type_name(),
        hook: hook.name,
        phase,
        reason,
    };

    error!("{}", error);
    Err(error)
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_string())
}

#[cfg(test)]
mod tests {
    use crate::catalog::{downcast_component, ComponentDescriptor, LifecycleHook};
    use crate::component::Injectable;
    use crate::error::HookPhase;
    use crate::instance_provider::{
        into_error_ptr, CastInstancePtr, ComponentInstanceAnyPtr, ComponentInstancePtr, ErrorPtr,
    };
    use crate::lifecycle::{run_post_construct, run_pre_destroy};
    use crate::registry::RegistryEntry;
    use std::any::{Any, TypeId};
    use std::io::{Error, ErrorKind};
    use std::sync::{Arc, Mutex};

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Injectable for Recorder {}

    impl Recorder {
        fn record(&self, event: &str) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}.{}", self.name, event));
        }
    }

    fn first(instance: &(dyn Any + Send + Sync)) -> Result<(), ErrorPtr> {
        downcast_component::<Recorder>(instance)?.record("first");
        Ok(())
    }

    fn second(instance: &(dyn Any + Send + Sync)) -> Result<(), ErrorPtr> {
        downcast_component::<Recorder>(instance)?.record("second");
        Ok(())
    }

    fn failing(_instance: &(dyn Any + Send + Sync)) -> Result<(), ErrorPtr> {
        Err(into_error_ptr(Error::new(ErrorKind::Other, "hook failed")))
    }

    fn panicking(_instance: &(dyn Any + Send + Sync)) -> Result<(), ErrorPtr> {
        panic!("hook panicked")
    }

    fn create_entry(
        name: &'static str,
        log: &Arc<Mutex<Vec<String>>>,
        descriptor: ComponentDescriptor,
    ) -> RegistryEntry {
        let instance = ComponentInstancePtr::new(Recorder {
            name,
            log: log.clone(),
        });
        let views = [(
            TypeId::of::<Recorder>(),
            Arc::new(instance.clone()) as CastInstancePtr,
        )]
        .into_iter()
        .collect();

        RegistryEntry::new(
            Arc::new(descriptor),
            instance as ComponentInstanceAnyPtr,
            views,
            false,
        )
    }

    #[test]
    fn should_run_post_construct_in_declaration_order() {
        let log = Arc::new(Mutex::new(vec![]));
        let entry = create_entry(
            "a",
            &log,
            ComponentDescriptor::new::<Recorder>("Recorder")
                .with_post_construct(LifecycleHook::new("first", first))
                .with_post_construct(LifecycleHook::new("second", second)),
        );

        assert!(run_post_construct(&entry).is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["a.first", "a.second"]);
    }

    #[test]
    fn should_isolate_failing_hooks() {
        let log = Arc::new(Mutex::new(vec![]));
        let entry = create_entry(
            "a",
            &log,
            ComponentDescriptor::new::<Recorder>("Recorder")
                .with_post_construct(LifecycleHook::new("failing", failing))
                .with_post_construct(LifecycleHook::new("panicking", panicking))
                .with_post_construct(LifecycleHook::new("first", first)),
        );

        let errors = run_post_construct(&entry);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].hook, "failing");
        assert_eq!(errors[0].reason, "hook failed");
        assert_eq!(errors[0].phase, HookPhase::PostConstruct);
        assert_eq!(errors[1].hook, "panicking");
        assert_eq!(errors[1].reason, "hook panicked");
        assert_eq!(*log.lock().unwrap(), vec!["a.first"]);
    }

    #[test]
    fn should_run_pre_destroy_in_reverse_registration_order() {
        let log = Arc::new(Mutex::new(vec![]));
        let entries = [
            create_entry(
                "a",
                &log,
                ComponentDescriptor::new::<Recorder>("Recorder")
                    .with_pre_destroy(LifecycleHook::new("first", first)),
            ),
            create_entry(
                "b",
                &log,
                ComponentDescriptor::new::<Recorder>("Recorder")
                    .with_pre_destroy(LifecycleHook::new("panicking", panicking))
                    .with_pre_destroy(LifecycleHook::new("first", first))
                    .with_pre_destroy(LifecycleHook::new("second", second)),
            ),
        ];

        let errors = run_pre_destroy(&entries);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].phase, HookPhase::PreDestroy);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["b.first", "b.second", "a.first"]
        );
    }
}
