//! Registration helpers and the process-wide registry
//!
//! Applications normally own a [`Registry`] value and pass it around. For
//! code that cannot, [`initialize`] and [`cleanup`] manage a shared one with
//! reference counting: only the first `initialize` creates it and only the
//! matching last `cleanup` tears it down.

use crate::class::Class;
use crate::enumeration::{Enumeration, ReflectEnum};
use crate::error::Result;
use crate::object::Reflect;
use crate::registry::{Registry, RegistryConfig};
use crate::ty::Type;
use parking_lot::Mutex;
use std::sync::Arc;

/// Teardown step returned by the registration helpers
pub type Unregister = Box<dyn FnOnce(&Registry) + Send>;

/// Teardown steps, run in reverse order of registration
#[derive(Default)]
pub struct InitializerStack {
    entries: Vec<Unregister>,
}

impl InitializerStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, unregister: Unregister) {
        self.entries.push(unregister);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pop and run every step, last pushed first
    pub fn cleanup(&mut self, registry: &Registry) {
        while let Some(unregister) = self.entries.pop() {
            unregister(registry);
        }
    }
}

/// Register class `T`, optionally under a custom short name
pub fn register_class_type<T: Reflect>(registry: &Registry, short_name: Option<&str>) -> Result<Unregister> {
    let mut class = Class::of::<T>()?;
    if let Some(short_name) = short_name {
        class = class.with_short_name(short_name);
    }
    let id = registry.try_register_type(Type::Class(Arc::new(class)))?;
    Ok(Box::new(move |registry: &Registry| {
        registry.unregister_type(id);
    }))
}

/// Register enumeration `E`, optionally under a custom short name
pub fn register_enum_type<E: ReflectEnum>(registry: &Registry, short_name: Option<&str>) -> Result<Unregister> {
    let mut enumeration = Enumeration::of::<E>()?;
    if let Some(short_name) = short_name {
        enumeration = enumeration.with_short_name(short_name);
    }
    let id = registry.try_register_type(Type::Enumeration(Arc::new(enumeration)))?;
    Ok(Box::new(move |registry: &Registry| {
        registry.unregister_type(id);
    }))
}

struct GlobalRegistry {
    count: usize,
    registry: Option<Arc<Registry>>,
}

static GLOBAL: Mutex<GlobalRegistry> = parking_lot::const_mutex(GlobalRegistry {
    count: 0,
    registry: None,
});

/// Acquire the shared registry, creating it on first use
pub fn initialize() -> Arc<Registry> {
    initialize_with(RegistryConfig::default())
}

/// Like [`initialize`], the config only applies when the registry is created
pub fn initialize_with(config: RegistryConfig) -> Arc<Registry> {
    let mut global = GLOBAL.lock();
    global.count += 1;
    match &global.registry {
        Some(registry) => registry.clone(),
        None => {
            log::debug!("Initializing reflection registry");
            let registry = Arc::new(Registry::new(config));
            global.registry = Some(registry.clone());
            registry
        }
    }
}

/// Release one reference to the shared registry
pub fn cleanup() {
    let released = {
        let mut global = GLOBAL.lock();
        debug_assert!(global.count > 0, "reflection cleanup without initialize");
        if global.count == 0 {
            return;
        }
        global.count -= 1;
        if global.count == 0 {
            global.registry.take()
        } else {
            None
        }
    };

    if let Some(registry) = released {
        log::debug!("Cleaning up reflection registry");
        registry.cleanup();
    }
}

/// The shared registry, if initialized
pub fn registry() -> Option<Arc<Registry>> {
    GLOBAL.lock().registry.clone()
}

pub fn is_initialized() -> bool {
    GLOBAL.lock().count > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_stack_runs_in_reverse() {
        static ORDER: AtomicUsize = AtomicUsize::new(0);
        let registry = Registry::default();
        let mut stack = InitializerStack::new();
        stack.push(Box::new(|_: &Registry| {
            assert_eq!(ORDER.fetch_add(1, Ordering::SeqCst), 1);
        }));
        stack.push(Box::new(|_: &Registry| {
            assert_eq!(ORDER.fetch_add(1, Ordering::SeqCst), 0);
        }));
        assert_eq!(stack.len(), 2);

        stack.cleanup(&registry);
        assert!(stack.is_empty());
        assert_eq!(ORDER.load(Ordering::SeqCst), 2);
    }
}
