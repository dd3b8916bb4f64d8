//! Interception of capability calls for execution-time logging.
//!
//! A component gets wrapped only when it declares at least one capability *and* at least one of
//! its methods carries the `#[log_execution_time]` tag. In that case every capability view of the
//! component is a [TimingProxy], which forwards each call to the real instance and, for tagged
//! methods, logs `{type}.{method} took {duration} ms`. Arguments, return values and panics pass
//! through unchanged. Lookups by the concrete type always return the unwrapped instance.
//!
//! The forwarding implementation of a capability trait for `TimingProxy<dyn Trait + Send + Sync>`
//! is generated by the `#[injectable]` attribute.

use crate::catalog::ComponentDescriptor;
use crate::error::ComponentInstanceProviderError;
use crate::instance_provider::{CastInstancePtr, ComponentInstanceAnyPtr, ComponentInstancePtr};
use fxhash::{FxHashMap, FxHashSet};
use std::any::TypeId;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Data shared by the proxies of a single capability of a component.
#[derive(Clone, Debug)]
pub struct InterceptionContext {
    type_name: &'static str,
    timed_methods: Arc<FxHashSet<&'static str>>,
}

impl InterceptionContext {
    pub fn new(type_name: &'static str, timed_methods: FxHashSet<&'static str>) -> Self {
        Self {
            type_name,
            timed_methods: Arc::new(timed_methods),
        }
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn is_timed(&self, method: &str) -> bool {
        self.timed_methods.contains(method)
    }
}

/// Forwarding wrapper around a capability of a component.
pub struct TimingProxy<T: ?Sized> {
    target: ComponentInstancePtr<T>,
    context: InterceptionContext,
}

impl<T: ?Sized> TimingProxy<T> {
    pub fn new(target: ComponentInstancePtr<T>, context: InterceptionContext) -> Self {
        Self { target, context }
    }

    /// The wrapped instance.
    #[inline]
    pub fn target(&self) -> &ComponentInstancePtr<T> {
        &self.target
    }

    #[inline]
    pub fn context(&self) -> &InterceptionContext {
        &self.context
    }

    /// Forwards a call to the target, measuring it if the method is tagged.
    pub fn intercept<'a, R>(&'a self, method: &'static str, call: impl FnOnce(&'a T) -> R) -> R {
        let target: &'a T = &self.target;
        if !self.context.is_timed(method) {
            return call(target);
        }

        let (result, elapsed) = measure(move || call(target));
        log_execution_time(self.context.type_name, method, elapsed);
        result
    }
}

impl<T: ?Sized> Debug for TimingProxy<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingProxy")
            .field("context", &self.context)
            .finish()
    }
}

/// Runs the given function, returning its result and wall-clock duration.
pub fn measure<R>(call: impl FnOnce() -> R) -> (R, Duration) {
    let start = Instant::now();
    let result = call();
    (result, start.elapsed())
}

fn log_execution_time(type_name: &str, method: &str, elapsed: Duration) {
    info!("{}.{} took {} ms", type_name, method, elapsed.as_millis());
}

/// Typed views of a freshly constructed component.
#[derive(Debug)]
pub struct ComponentViews {
    pub views: FxHashMap<TypeId, CastInstancePtr>,
    pub is_proxied: bool,
}

/// Builds lookup views for an instance: the concrete type and each capability, which get
/// wrapped in a [TimingProxy] if the component has timed methods.
pub fn wrap_if_needed(
    descriptor: &ComponentDescriptor,
    instance: &ComponentInstanceAnyPtr,
) -> Result<ComponentViews, ComponentInstanceProviderError> {
    let incompatible =
        |_| ComponentInstanceProviderError::IncompatibleComponent(descriptor.type_name);

    let mut views = FxHashMap::default();
    views.insert(
        descriptor.type_id,
        (descriptor.cast)(instance.clone()).map_err(incompatible)?,
    );

    let is_proxied =
        !descriptor.capabilities.is_empty() && !descriptor.timed_methods().is_empty();

    for capability in &descriptor.capabilities {
        let view = if is_proxied {
            // timing is decided per capability, since capabilities may share method names
            let context = InterceptionContext::new(
                descriptor.type_name,
                capability.timed_methods.iter().copied().collect(),
            );
            (capability.wrap)(instance.clone(), context)
        } else {
            (capability.cast)(instance.clone())
        }
        .map_err(incompatible)?;

        views.insert(capability.type_id, view);
    }

    Ok(ComponentViews {
        views,
        is_proxied,
    })
}
