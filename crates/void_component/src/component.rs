//! Component - Reflected data attached to a host
//!
//! A component is a reflected object that occupies one slot of a
//! [`ComponentCollection`](crate::ComponentCollection). The slot is the
//! component's own type id unless the type names another class as its slot,
//! which lets interchangeable variants (say two kinds of light) exclude each
//! other.

use core::fmt;
use void_reflect::{type_id_of, Object, ObjectPtr, Reflect, TypeId};

/// Owned, dynamically typed component
pub type ComponentPtr = Box<dyn Component>;

/// Where a component may be attached
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ComponentBehavior {
    /// Accepted by any collection
    #[default]
    Normal,
    /// Only accepted by collections whose policy allows it
    Exclusive,
}

/// Trait implemented by reflected structs that can be components
///
/// ```ignore
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct PointLight {
///     radius: f32,
/// }
///
/// impl Reflect for PointLight { ... }
///
/// impl ComponentType for PointLight {
///     const SLOT: Option<&'static str> = Some("Light");
/// }
/// ```
pub trait ComponentType: Reflect {
    /// Canonical name of the class whose slot this type occupies
    const SLOT: Option<&'static str> = None;

    const BEHAVIOR: ComponentBehavior = ComponentBehavior::Normal;

    /// Check that `sibling` may live in the same collection, `Err` holds the reason
    fn validate_sibling(&self, _sibling: &dyn Component) -> Result<(), String> {
        Ok(())
    }

    /// Disabled components are ignored by subset checks
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Slot occupied by components of type `T`
pub fn slot_of<T: ComponentType>() -> TypeId {
    match T::SLOT {
        Some(slot) => TypeId::of_name(slot),
        None => type_id_of::<T>(),
    }
}

/// Dynamically typed view of a component
pub trait Component: Object {
    fn as_object(&self) -> &dyn Object;

    fn as_object_mut(&mut self) -> &mut dyn Object;

    fn into_object(self: Box<Self>) -> ObjectPtr;

    /// Deep copy
    fn clone_component(&self) -> ComponentPtr;

    fn slot(&self) -> TypeId;

    fn behavior(&self) -> ComponentBehavior;

    fn validate_sibling(&self, sibling: &dyn Component) -> Result<(), String>;

    fn is_enabled(&self) -> bool;
}

impl<T: ComponentType> Component for T {
    fn as_object(&self) -> &dyn Object {
        self
    }

    fn as_object_mut(&mut self) -> &mut dyn Object {
        self
    }

    fn into_object(self: Box<Self>) -> ObjectPtr {
        self
    }

    fn clone_component(&self) -> ComponentPtr {
        Box::new(self.clone())
    }

    fn slot(&self) -> TypeId {
        slot_of::<T>()
    }

    fn behavior(&self) -> ComponentBehavior {
        T::BEHAVIOR
    }

    fn validate_sibling(&self, sibling: &dyn Component) -> Result<(), String> {
        ComponentType::validate_sibling(self, sibling)
    }

    fn is_enabled(&self) -> bool {
        ComponentType::is_enabled(self)
    }
}

impl dyn Component {
    /// Check if the component is of type `T`
    pub fn is<T: ComponentType>(&self) -> bool {
        self.as_object().is::<T>()
    }

    pub fn downcast_ref<T: ComponentType>(&self) -> Option<&T> {
        self.as_object().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: ComponentType>(&mut self) -> Option<&mut T> {
        self.as_object_mut().downcast_mut::<T>()
    }
}

impl Clone for ComponentPtr {
    fn clone(&self) -> Self {
        self.clone_component()
    }
}

impl PartialEq for dyn Component {
    fn eq(&self, other: &Self) -> bool {
        self.as_object().equals_object(other.as_object())
    }
}

impl fmt::Display for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (slot {})", self.class_name(), self.slot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_reflect::Compositor;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Spot {
        angle: f32,
    }

    impl Reflect for Spot {
        const NAME: &'static str = "Spot";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Angle", |s| &s.angle, |s| &mut s.angle);
        }
    }

    impl ComponentType for Spot {
        const SLOT: Option<&'static str> = Some("Light");
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Tag;

    impl Reflect for Tag {
        const NAME: &'static str = "Tag";
    }

    impl ComponentType for Tag {
        const BEHAVIOR: ComponentBehavior = ComponentBehavior::Exclusive;
    }

    #[test]
    fn test_slot_override() {
        assert_eq!(slot_of::<Spot>(), TypeId::of_name("Light"));
        assert_eq!(slot_of::<Tag>(), type_id_of::<Tag>());

        let spot: ComponentPtr = Box::new(Spot { angle: 30.0 });
        assert_eq!(spot.slot(), TypeId::of_name("Light"));
        assert_eq!(spot.behavior(), ComponentBehavior::Normal);
        assert!(spot.is_enabled());
    }

    #[test]
    fn test_downcast_and_clone() {
        let spot: ComponentPtr = Box::new(Spot { angle: 45.0 });
        let copy = spot.clone();
        assert!(*copy == *spot);
        assert!(copy.is::<Spot>());
        assert!(!copy.is::<Tag>());
        assert_eq!(copy.downcast_ref::<Spot>().unwrap().angle, 45.0);

        let object = copy.into_object();
        assert_eq!(object.class_name(), "Spot");
    }
}
