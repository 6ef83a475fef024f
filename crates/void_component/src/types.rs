//! Component type table
//!
//! Archives and the registry hand back plain reflected objects. The
//! [`ComponentTypes`] table remembers which registered classes are
//! components so those objects can be turned back into [`ComponentPtr`]s.

use crate::component::{ComponentPtr, ComponentType};
use crate::error::{ComponentError, Result};
use std::collections::HashMap;
use void_reflect::{downcast_object, type_id_of, ObjectPtr, Registry, TypeId};

type Converter = fn(ObjectPtr) -> std::result::Result<ComponentPtr, ObjectPtr>;

fn convert<T: ComponentType>(object: ObjectPtr) -> std::result::Result<ComponentPtr, ObjectPtr> {
    downcast_object::<T>(object).map(|component| component as ComponentPtr)
}

/// Registered component classes
#[derive(Default)]
pub struct ComponentTypes {
    converters: HashMap<TypeId, Converter>,
}

impl ComponentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` with the registry and record it as a component type
    pub fn register<T: ComponentType>(&mut self, registry: &Registry) -> Result<TypeId> {
        let id = registry.register_class::<T>()?;
        if self.converters.insert(id, convert::<T>).is_none() {
            log::debug!("Registered component type '{}'", T::NAME);
        }
        Ok(id)
    }

    /// Record `T` without touching the registry
    pub fn insert<T: ComponentType>(&mut self) -> TypeId {
        let id = type_id_of::<T>();
        self.converters.insert(id, convert::<T>);
        id
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.converters.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Turn a reflected object back into a component
    pub fn to_component(&self, object: ObjectPtr) -> Result<ComponentPtr> {
        let name = object.class_name();
        let converter = self
            .converters
            .get(&object.reflect_type())
            .ok_or_else(|| ComponentError::NotAComponent(name.to_string()))?;
        converter(object).map_err(|object| ComponentError::NotAComponent(object.class_name().to_string()))
    }

    /// Create a blank component of a registered class
    pub fn create(&self, registry: &Registry, id: TypeId) -> Option<ComponentPtr> {
        if !self.contains(id) {
            return None;
        }
        let object = registry.create_instance(id)?;
        self.to_component(object).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_reflect::{Compositor, Reflect};

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Health {
        points: i32,
    }

    impl Reflect for Health {
        const NAME: &'static str = "Health";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Points", |s| &s.points, |s| &mut s.points);
        }
    }

    impl ComponentType for Health {}

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Plain;

    impl Reflect for Plain {
        const NAME: &'static str = "Plain";
    }

    #[test]
    fn test_round_trip_through_objects() {
        let registry = Registry::default();
        registry.register_class::<Plain>().unwrap();
        let mut types = ComponentTypes::new();
        let id = types.register::<Health>(&registry).unwrap();
        assert!(types.contains(id));

        let created = types.create(&registry, id).unwrap();
        assert!(created.is::<Health>());

        let object: ObjectPtr = Box::new(Health { points: 12 });
        let component = types.to_component(object).unwrap();
        assert_eq!(component.downcast_ref::<Health>().unwrap().points, 12);

        let plain: ObjectPtr = Box::new(Plain);
        assert!(matches!(types.to_component(plain), Err(ComponentError::NotAComponent(_))));
        assert!(types.create(&registry, type_id_of::<Plain>()).is_none());
    }
}
