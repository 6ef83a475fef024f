//! Component collections
//!
//! A [`ComponentCollection`] holds at most one component per slot. Adding a
//! component can be validated against the slot, the collection's
//! [`CollectionPolicy`] and every sibling. Changes are reported to
//! listeners as [`CollectionEvent`]s carrying the collection's [`Tuid`];
//! components never point back at their owner.

use crate::component::{slot_of, Component, ComponentBehavior, ComponentPtr, ComponentType};
use crate::error::{ComponentError, Result};
use crate::types::ComponentTypes;
use std::collections::BTreeMap;
use std::sync::Arc;
use void_core::Tuid;
use void_reflect::{Class, ObjectPtr, Registry, TypeId};

/// Host-specific acceptance rules
pub trait CollectionPolicy: Send + Sync {
    /// Check that the host accepts this kind of component, `Err` holds the reason
    fn validate_compatible(&self, component: &dyn Component) -> std::result::Result<(), String> {
        match component.behavior() {
            ComponentBehavior::Normal => Ok(()),
            ComponentBehavior::Exclusive => Err(format!(
                "'{}' is an exclusive component",
                component.class_name()
            )),
        }
    }

    /// Whether a component is written out by [`ComponentCollection::to_elements`]
    fn is_persistent(&self, _component: &dyn Component) -> bool {
        true
    }
}

/// Accepts every non-exclusive component
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPolicy;

impl CollectionPolicy for DefaultPolicy {}

/// Change notification raised by a collection
#[derive(Clone, Copy, Debug)]
pub enum CollectionEvent<'a> {
    ComponentAdded {
        collection: Tuid,
        component: &'a dyn Component,
    },
    /// Raised after removal, the component is still alive for inspection
    ComponentRemoved {
        collection: Tuid,
        component: &'a dyn Component,
    },
    ComponentChanged {
        collection: Tuid,
        component: &'a dyn Component,
    },
    CollectionChanged {
        collection: Tuid,
    },
}

impl CollectionEvent<'_> {
    pub fn collection(&self) -> Tuid {
        match self {
            CollectionEvent::ComponentAdded { collection, .. }
            | CollectionEvent::ComponentRemoved { collection, .. }
            | CollectionEvent::ComponentChanged { collection, .. }
            | CollectionEvent::CollectionChanged { collection } => *collection,
        }
    }

    /// Component the event is about, `None` for collection-wide changes
    pub fn component(&self) -> Option<&dyn Component> {
        match self {
            CollectionEvent::ComponentAdded { component, .. }
            | CollectionEvent::ComponentRemoved { component, .. }
            | CollectionEvent::ComponentChanged { component, .. } => Some(*component),
            CollectionEvent::CollectionChanged { .. } => None,
        }
    }
}

/// Listener callback
pub type Listener = Box<dyn Fn(&CollectionEvent<'_>) + Send + Sync>;

/// Listener handle, used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Slot-keyed set of components owned by a host
pub struct ComponentCollection {
    id: Tuid,
    components: BTreeMap<TypeId, ComponentPtr>,
    policy: Arc<dyn CollectionPolicy>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    modified: bool,
}

impl ComponentCollection {
    /// Create an empty collection with a fresh id and the default policy
    pub fn new() -> Self {
        Self::with_id(Tuid::generate())
    }

    pub fn with_id(id: Tuid) -> Self {
        Self {
            id,
            components: BTreeMap::new(),
            policy: Arc::new(DefaultPolicy),
            listeners: Vec::new(),
            next_listener: 1,
            modified: false,
        }
    }

    /// Replace the acceptance policy
    pub fn with_policy(mut self, policy: Arc<dyn CollectionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn id(&self) -> Tuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Components in slot order
    pub fn components(&self) -> impl Iterator<Item = &dyn Component> + '_ {
        self.components.values().map(|c| &**c)
    }

    pub fn slots(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.components.keys().copied()
    }

    // ---- listeners ----

    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&CollectionEvent<'_>) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    fn raise(&self, event: CollectionEvent<'_>) {
        for (_, listener) in &self.listeners {
            listener(&event);
        }
    }

    // ---- membership ----

    /// Check whether `component` may be added
    pub fn validate_component(&self, component: &dyn Component) -> Result<()> {
        let slot = component.slot();
        debug_assert!(slot.is_valid(), "component '{}' has an invalid slot", component.class_name());

        if let Some(existing) = self.components.get(&slot) {
            return Err(ComponentError::Duplicate {
                component: component.class_name().to_string(),
                slot,
                existing: existing.class_name().to_string(),
            });
        }

        self.policy
            .validate_compatible(component)
            .map_err(|reason| ComponentError::Incompatible {
                component: component.class_name().to_string(),
                reason,
            })?;

        // both directions, so a rule only has to be written on one side
        for sibling in self.components.values() {
            sibling
                .validate_sibling(component)
                .and_then(|_| component.validate_sibling(&**sibling))
                .map_err(|reason| ComponentError::SiblingConflict {
                    component: component.class_name().to_string(),
                    sibling: sibling.class_name().to_string(),
                    reason,
                })?;
        }
        Ok(())
    }

    /// Store a component in its slot
    ///
    /// With `validate` the call fails and leaves the collection unchanged
    /// when [`validate_component`](Self::validate_component) rejects the
    /// component. Without it, an occupied slot is overwritten and the
    /// previous component returned.
    pub fn set_component(&mut self, component: ComponentPtr, validate: bool) -> Result<Option<ComponentPtr>> {
        if validate {
            self.validate_component(&*component)?;
        }

        let slot = component.slot();
        let previous = self.components.insert(slot, component);
        if let Some(previous) = &previous {
            log::debug!("Replaced '{}' in collection {}", previous.class_name(), self.id);
            self.raise(CollectionEvent::ComponentRemoved {
                collection: self.id,
                component: &**previous,
            });
        }

        self.modified = true;
        if let Some(added) = self.components.get(&slot) {
            self.raise(CollectionEvent::ComponentAdded {
                collection: self.id,
                component: &**added,
            });
        }
        Ok(previous)
    }

    /// Remove the component in `slot`, `None` if the slot was empty
    pub fn remove_component(&mut self, slot: TypeId) -> Option<ComponentPtr> {
        let removed = self.components.remove(&slot)?;
        self.modified = true;
        self.raise(CollectionEvent::ComponentRemoved {
            collection: self.id,
            component: &*removed,
        });
        Some(removed)
    }

    pub fn contains_component(&self, slot: TypeId) -> bool {
        self.components.contains_key(&slot)
    }

    pub fn get_component(&self, slot: TypeId) -> Option<&dyn Component> {
        self.components.get(&slot).map(|c| &**c)
    }

    /// The component of type `T`, looked up through `T`'s slot
    pub fn get<T: ComponentType>(&self) -> Option<&T> {
        self.components.get(&slot_of::<T>())?.downcast_ref::<T>()
    }

    /// Look up `slot`, then the slots of its base classes
    pub fn find_component(&self, registry: &Registry, slot: TypeId) -> Option<&dyn Component> {
        if let Some(component) = self.get_component(slot) {
            return Some(component);
        }
        registry
            .ancestry(slot)
            .iter()
            .skip(1)
            .find_map(|base| self.get_component(base.id()))
    }

    /// Mutate a component in place and raise the change events
    pub fn modify<R>(&mut self, slot: TypeId, f: impl FnOnce(&mut dyn Component) -> R) -> Option<R> {
        let component = self.components.get_mut(&slot)?;
        let result = f(&mut **component);
        self.component_changed(Some(slot));
        Some(result)
    }

    /// Report a change
    ///
    /// `None` reports a collection-wide change. A slot reports a change of
    /// that component followed by a collection-wide change.
    pub fn component_changed(&mut self, slot: Option<TypeId>) {
        self.modified = true;
        if let Some(component) = slot.and_then(|slot| self.components.get(&slot)) {
            self.raise(CollectionEvent::ComponentChanged {
                collection: self.id,
                component: &**component,
            });
        }
        self.raise(CollectionEvent::CollectionChanged { collection: self.id });
    }

    /// Remove every component, one removal event each
    pub fn clear(&mut self) {
        let slots: Vec<TypeId> = self.components.keys().copied().collect();
        for slot in slots {
            self.remove_component(slot);
        }
    }

    /// Check that every enabled component of `other` has a slot here
    pub fn is_subset(&self, other: &ComponentCollection) -> bool {
        other
            .components()
            .filter(|c| c.is_enabled())
            .all(|c| self.contains_component(c.slot()))
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    // ---- copy and persistence ----

    /// Replace the contents of `dest` with deep copies of these components
    ///
    /// A copy the destination rejects is retried in place of the component
    /// already in that slot. When that fails too, the slot is left as it
    /// was and, if a registry is given, classes sharing the component's base
    /// are tried in its place.
    pub fn copy_to(&self, dest: &mut ComponentCollection, registry: Option<(&Registry, &ComponentTypes)>) {
        dest.clear();
        for component in self.components.values() {
            if copy_component_to(dest, component.clone_component()) {
                continue;
            }
            let substituted = registry.map_or(false, |(registry, types)| {
                substitutes(registry, types, &**component).into_iter().any(|mut candidate| {
                    Class::copy(registry, component.as_object(), candidate.as_object_mut()).is_ok()
                        && copy_component_to(dest, candidate)
                })
            });
            if !substituted {
                log::warn!(
                    "'{}' could not be copied to collection {}",
                    component.class_name(),
                    dest.id
                );
            }
        }
    }

    /// Persisted components as reflected objects, in slot order
    pub fn to_elements(&self) -> Vec<ObjectPtr> {
        self.components
            .values()
            .filter(|c| self.policy.is_persistent(&***c))
            .map(|c| c.as_object().clone_object())
            .collect()
    }

    /// Load components read back from an archive
    ///
    /// Elements are slotted without validation, as they were when written.
    /// Fails without changing the collection if any element is not a
    /// registered component type.
    pub fn from_elements(&mut self, types: &ComponentTypes, elements: Vec<ObjectPtr>) -> Result<()> {
        let components = elements
            .into_iter()
            .map(|element| types.to_component(element))
            .collect::<Result<Vec<_>>>()?;
        for component in components {
            self.set_component(component, false)?;
        }
        Ok(())
    }
}

impl Default for ComponentCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ComponentCollection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ComponentCollection")
            .field("id", &self.id)
            .field("components", &self.components)
            .field("listeners", &self.listeners.len())
            .field("modified", &self.modified)
            .finish()
    }
}

/// Insert `component`, displacing the slot's occupant if only it was in the way
fn copy_component_to(dest: &mut ComponentCollection, component: ComponentPtr) -> bool {
    if dest.validate_component(&*component).is_ok() {
        return dest.set_component(component, false).is_ok();
    }

    let slot = component.slot();
    let Some(existing) = dest.remove_component(slot) else {
        return false;
    };
    if dest.validate_component(&*component).is_ok() {
        dest.set_component(component, false).is_ok()
    } else {
        // restore; an unvalidated insert cannot fail
        let _ = dest.set_component(existing, false);
        false
    }
}

/// Blank instances of the other component classes derived from the base of `component`
fn substitutes(registry: &Registry, types: &ComponentTypes, component: &dyn Component) -> Vec<ComponentPtr> {
    let Some(base) = registry
        .get_class(component.reflect_type())
        .and_then(|class| class.base_name().and_then(|b| registry.get_class_by_name(b)))
    else {
        return Vec::new();
    };
    base.derived()
        .iter()
        .filter(|name| name.as_str() != component.class_name())
        .filter_map(|name| registry.get_class_by_name(name))
        .filter_map(|class| types.create(registry, class.id()))
        .collect()
}
