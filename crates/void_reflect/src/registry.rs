//! Type registry
//!
//! The [`Registry`] maps ids, names and aliases to registered [`Type`]s,
//! creates instances by id or name, and owns the serializer table used by
//! the archives. Registration is meant to happen once at startup on a
//! single thread; lookups may run from any thread afterwards.

use crate::class::Class;
use crate::data::{self, Data};
use crate::enumeration::{Enumeration, ReflectEnum};
use crate::error::{ReflectError, Result};
use crate::lifecycle::{InitializerStack, Unregister};
use crate::object::{type_id_of, Object, ObjectPtr, Reflect};
use crate::tracker::Tracker;
use crate::ty::{Type, TypeId};
use crate::value::{DataKind, DataTag};
use crate::version::Version;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Registry configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Record instance creation and release for leak diagnosis
    pub track_allocations: bool,
    /// Debug-assert that registration runs on the creating thread
    pub enforce_init_thread: bool,
    /// Maximum element nesting accepted by archive readers
    pub max_archive_depth: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            track_allocations: cfg!(feature = "tracker"),
            enforce_init_thread: true,
            max_archive_depth: 64,
        }
    }
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<TypeId, Type>,
    /// Canonical and short names
    by_name: HashMap<String, TypeId>,
    aliases: HashMap<String, TypeId>,
}

impl Tables {
    fn class(&self, id: TypeId) -> Option<&Arc<Class>> {
        self.by_id.get(&id).and_then(Type::as_class)
    }

    fn class_by_name(&self, name: &str) -> Option<&Arc<Class>> {
        self.by_name.get(name).and_then(|id| self.class(*id))
    }

    fn name_of(&self, id: TypeId) -> String {
        self.by_id
            .get(&id)
            .map(|ty| ty.name().to_string())
            .unwrap_or_else(|| id.to_string())
    }
}

/// Central type registry
pub struct Registry {
    config: RegistryConfig,
    tables: RwLock<Tables>,
    serializers: RwLock<HashMap<DataTag, Arc<dyn Data>>>,
    tracker: Option<Tracker>,
    initializers: Mutex<InitializerStack>,
    init_thread: ThreadId,
}

impl Registry {
    /// Create a registry with the built-in serializers and the `Version` class
    pub fn new(config: RegistryConfig) -> Self {
        let registry = Self {
            tracker: config.track_allocations.then(Tracker::new),
            config,
            tables: RwLock::new(Tables::default()),
            serializers: RwLock::new(HashMap::new()),
            initializers: Mutex::new(InitializerStack::new()),
            init_thread: thread::current().id(),
        };

        data::register_builtin(&registry);
        if let Err(e) = registry.register_class::<Version>() {
            log::error!("Failed to register Version: {}", e);
        }
        registry
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn check_thread(&self, operation: &str) {
        if self.config.enforce_init_thread {
            debug_assert_eq!(
                thread::current().id(),
                self.init_thread,
                "{} must run on the thread that created the registry",
                operation
            );
        }
    }

    // ---- registration ----

    /// Register a type, logging and returning false on conflict
    pub fn register_type(&self, ty: Type) -> bool {
        match self.try_register_type(ty) {
            Ok(_) => true,
            Err(e) => {
                log::error!("Type registration failed: {}", e);
                false
            }
        }
    }

    /// Register a type
    ///
    /// Registering identical metadata again is a no-op. Different metadata
    /// under an existing name is an error and the first definition stays.
    pub fn try_register_type(&self, ty: Type) -> Result<TypeId> {
        self.check_thread("register_type");

        if let Type::Enumeration(enumeration) = &ty {
            enumeration.validate()?;
        }

        let id = ty.id();
        let mut tables = self.tables.write();

        if let Some(existing) = tables.by_id.get(&id) {
            if existing.name() != ty.name() {
                return Err(ReflectError::IdCollision {
                    id,
                    name: ty.name().to_string(),
                    existing: existing.name().to_string(),
                });
            }
            if existing.same_definition(&ty) {
                log::debug!("Type '{}' already registered", ty.name());
                return Ok(id);
            }
            return Err(ReflectError::ConflictingRegistration {
                name: ty.name().to_string(),
            });
        }

        if let Some(other) = tables.by_name.get(ty.name()) {
            return Err(ReflectError::NameTaken {
                name: ty.name().to_string(),
                existing: tables.name_of(*other),
            });
        }

        if let Type::Class(class) = &ty {
            for field in class.fields() {
                for enumeration in field.kind().enumerations() {
                    let known = tables
                        .by_name
                        .get(enumeration)
                        .and_then(|id| tables.by_id.get(id))
                        .map_or(false, |t| t.as_enumeration().is_some());
                    if !known {
                        return Err(ReflectError::UnknownEnumeration {
                            field: format!("{}::{}", class.name(), field.name()),
                            enumeration: enumeration.to_string(),
                        });
                    }
                }
            }
        }

        tables.by_name.insert(ty.name().to_string(), id);
        if ty.short_name() != ty.name() {
            match tables.by_name.get(ty.short_name()) {
                Some(other) => log::warn!(
                    "Short name '{}' of '{}' is already used by '{}'",
                    ty.short_name(),
                    ty.name(),
                    tables.name_of(*other)
                ),
                None => {
                    tables.by_name.insert(ty.short_name().to_string(), id);
                }
            }
        }

        if let Type::Class(class) = &ty {
            // link to a known base, and adopt classes that registered before us
            if let Some(base) = class.base_name().and_then(|b| tables.class_by_name(b)) {
                base.link_derived(class.name());
            }
            for other in tables.by_id.values().filter_map(Type::as_class) {
                if other.base_name() == Some(class.name()) {
                    class.link_derived(other.name());
                }
            }
        }

        log::debug!("Registered {:?} '{}' as {}", ty.kind(), ty.name(), id);
        tables.by_id.insert(id, ty);
        Ok(id)
    }

    /// Remove a type together with its names, aliases and base link
    pub fn unregister_type(&self, id: TypeId) -> bool {
        self.check_thread("unregister_type");

        let mut tables = self.tables.write();
        let Some(ty) = tables.by_id.remove(&id) else {
            return false;
        };

        tables.by_name.retain(|_, bound| *bound != id);
        tables.aliases.retain(|_, bound| *bound != id);

        if let Type::Class(class) = &ty {
            if let Some(base) = class.base_name().and_then(|b| tables.class_by_name(b)) {
                base.unlink_derived(class.name());
            }
        }

        log::debug!("Unregistered '{}'", ty.name());
        true
    }

    /// Bind an additional lookup name to a registered type
    pub fn alias_type(&self, id: TypeId, alias: &str) -> bool {
        self.check_thread("alias_type");

        let mut tables = self.tables.write();
        if !tables.by_id.contains_key(&id) {
            log::error!("Cannot alias '{}' to unregistered type {}", alias, id);
            return false;
        }
        match tables.aliases.get(alias) {
            Some(bound) if *bound == id => true,
            Some(bound) => {
                log::error!(
                    "Alias '{}' is already bound to '{}'",
                    alias,
                    tables.name_of(*bound)
                );
                false
            }
            None => {
                tables.aliases.insert(alias.to_string(), id);
                true
            }
        }
    }

    pub fn unalias_type(&self, id: TypeId, alias: &str) -> bool {
        self.check_thread("unalias_type");

        let mut tables = self.tables.write();
        match tables.aliases.get(alias) {
            Some(bound) if *bound == id => {
                tables.aliases.remove(alias);
                true
            }
            _ => false,
        }
    }

    /// Register `T` and keep its unregistration for teardown
    pub fn register_class<T: Reflect>(&self) -> Result<TypeId> {
        let unregister = crate::lifecycle::register_class_type::<T>(self, None)?;
        self.push_initializer(unregister);
        Ok(type_id_of::<T>())
    }

    /// Register `E` and keep its unregistration for teardown
    pub fn register_enum<E: ReflectEnum>(&self) -> Result<TypeId> {
        let unregister = crate::lifecycle::register_enum_type::<E>(self, None)?;
        self.push_initializer(unregister);
        Ok(TypeId::of_name(E::NAME))
    }

    /// Queue a teardown step, run in reverse order by [`Registry::cleanup`]
    pub fn push_initializer(&self, unregister: Unregister) {
        self.initializers.lock().push(unregister);
    }

    /// Run every queued teardown step
    pub fn cleanup(&self) {
        let mut stack = std::mem::take(&mut *self.initializers.lock());
        stack.cleanup(self);
    }

    // ---- lookup ----

    pub fn get_type(&self, id: TypeId) -> Option<Type> {
        self.tables.read().by_id.get(&id).cloned()
    }

    /// Look up by canonical or short name, then by alias
    pub fn get_type_by_name(&self, name: &str) -> Option<Type> {
        let tables = self.tables.read();
        tables
            .by_name
            .get(name)
            .or_else(|| tables.aliases.get(name))
            .and_then(|id| tables.by_id.get(id))
            .cloned()
    }

    /// Like [`get_type_by_name`](Self::get_type_by_name) with a
    /// case-insensitive scan as the last resort
    ///
    /// The scan is linear, use only for legacy or hand-written names.
    pub fn find_type_legacy(&self, name: &str) -> Option<Type> {
        if let Some(ty) = self.get_type_by_name(name) {
            return Some(ty);
        }
        let tables = self.tables.read();
        // canonical names win over aliases, ties resolve to the smallest name
        let closest = |names: &HashMap<String, TypeId>| {
            names
                .iter()
                .filter(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
                .min_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(_, id)| *id)
        };
        let id = closest(&tables.by_name).or_else(|| closest(&tables.aliases))?;
        log::warn!("Resolved type '{}' by case-insensitive match", name);
        tables.by_id.get(&id).cloned()
    }

    pub fn get_class(&self, id: TypeId) -> Option<Arc<Class>> {
        self.tables.read().class(id).cloned()
    }

    pub fn get_class_by_name(&self, name: &str) -> Option<Arc<Class>> {
        self.get_type_by_name(name).and_then(|ty| ty.as_class().cloned())
    }

    pub fn get_enumeration(&self, id: TypeId) -> Option<Arc<Enumeration>> {
        self.get_type(id).and_then(|ty| ty.as_enumeration().cloned())
    }

    pub fn get_enumeration_by_name(&self, name: &str) -> Option<Arc<Enumeration>> {
        self.get_type_by_name(name).and_then(|ty| ty.as_enumeration().cloned())
    }

    /// Class registered for `T`
    pub fn class_of<T: Reflect>(&self) -> Option<Arc<Class>> {
        self.get_class(type_id_of::<T>())
    }

    /// Enumeration registered for `E`
    pub fn enumeration_of<E: ReflectEnum>(&self) -> Option<Arc<Enumeration>> {
        self.get_enumeration(TypeId::of_name(E::NAME))
    }

    /// Resolve a persisted class name through names, aliases and the legacy scan
    pub(crate) fn resolve_class(&self, name: &str) -> Option<Arc<Class>> {
        self.find_type_legacy(name).and_then(|ty| ty.as_class().cloned())
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.tables.read().by_id.contains_key(&id)
    }

    pub fn type_count(&self) -> usize {
        self.tables.read().by_id.len()
    }

    /// Snapshot of every registered type
    pub fn types(&self) -> Vec<Type> {
        self.tables.read().by_id.values().cloned().collect()
    }

    // ---- inheritance ----

    /// Check if `id` is `base` or derives from it
    pub fn is_a(&self, id: TypeId, base: TypeId) -> bool {
        let tables = self.tables.read();
        let mut current = tables.class(id);
        let mut depth = 0;
        while let Some(class) = current {
            if class.id() == base {
                return true;
            }
            depth += 1;
            if depth > tables.by_id.len() {
                log::error!("Inheritance cycle through '{}'", class.name());
                return false;
            }
            current = class.base_name().and_then(|b| tables.class_by_name(b));
        }
        false
    }

    /// Chain of classes from `id` up to its root, `id` first
    pub fn ancestry(&self, id: TypeId) -> Vec<Arc<Class>> {
        let tables = self.tables.read();
        let mut chain = Vec::new();
        let mut current = tables.class(id);
        while let Some(class) = current {
            if chain.iter().any(|c: &Arc<Class>| c.id() == class.id()) {
                break;
            }
            chain.push(class.clone());
            current = class.base_name().and_then(|b| tables.class_by_name(b));
        }
        chain
    }

    /// Deepest class both `a` and `b` derive from
    pub fn common_base(&self, a: TypeId, b: TypeId) -> Option<Arc<Class>> {
        self.ancestry(a).into_iter().find(|class| self.is_a(b, class.id()))
    }

    // ---- instances ----

    pub fn create_instance(&self, id: TypeId) -> Option<ObjectPtr> {
        let class = self.get_class(id)?;
        self.create_instance_of(&class)
    }

    pub fn create_instance_by_name(&self, name: &str) -> Option<ObjectPtr> {
        let class = self.get_class_by_name(name)?;
        self.create_instance_of(&class)
    }

    /// Create a blank instance, `None` for abstract classes
    pub fn create_instance_of(&self, class: &Class) -> Option<ObjectPtr> {
        let object = class.create()?;
        if let Some(tracker) = &self.tracker {
            tracker.track_create(&*object);
        }
        Some(object)
    }

    /// Drop an instance, recording the release when tracking
    ///
    /// Nested elements the instance owns are released with it.
    pub fn release(&self, object: ObjectPtr) {
        if let Some(tracker) = &self.tracker {
            tracker.track_delete(&*object);
            self.forget_nested(tracker, &*object);
        }
        drop(object);
    }

    fn forget_nested(&self, tracker: &Tracker, object: &dyn Object) {
        let Some(class) = self.get_class(object.reflect_type()) else {
            return;
        };
        for field in class.fields() {
            field.for_each_element(object, &mut |nested: &dyn Object| {
                tracker.forget(nested);
                self.forget_nested(tracker, nested);
            });
        }
    }

    pub fn tracker(&self) -> Option<&Tracker> {
        self.tracker.as_ref()
    }

    // ---- serializers ----

    /// Install the serializer for one data tag, replacing any previous one
    pub fn register_serializer(&self, data: Arc<dyn Data>) {
        let tag = data.tag();
        if self.serializers.write().insert(tag, data).is_some() {
            log::debug!("Replaced {} serializer", tag.name());
        }
    }

    pub fn serializer(&self, tag: DataTag) -> Option<Arc<dyn Data>> {
        self.serializers.read().get(&tag).cloned()
    }

    pub fn serializer_for(&self, kind: &DataKind) -> Result<Arc<dyn Data>> {
        self.serializer(kind.tag())
            .ok_or_else(|| ReflectError::MissingSerializer(kind.to_string()))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let pending = self.initializers.lock().len();
        if pending > 0 {
            log::debug!("Dropping registry with {} teardown step(s) not run", pending);
        }
        if let Some(tracker) = &self.tracker {
            tracker.dump_leaks();
        }
    }
}
