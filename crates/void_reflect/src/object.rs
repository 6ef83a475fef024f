//! Reflected objects
//!
//! A struct becomes reflectable by implementing [`Reflect`]: a canonical
//! name plus a declarative `enumerate` callback that describes its fields.
//! Every `Reflect` type is also an [`Object`], the dynamically typed view
//! used by the registry, archives and component collections.

use crate::composite::Compositor;
use crate::ty::TypeId;
use crate::version::Version;
use core::any::Any;
use core::fmt;

/// Owned, dynamically typed reflected object
pub type ObjectPtr = Box<dyn Object>;

/// Trait implemented by every reflected struct
///
/// ```ignore
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct Foo {
///     count: i32,
///     name: String,
/// }
///
/// impl Reflect for Foo {
///     const NAME: &'static str = "Foo";
///
///     fn enumerate(comp: &mut Compositor<Self>) {
///         comp.field("m_Count", |s| &s.count, |s| &mut s.count);
///         comp.field("m_Name", |s| &s.name, |s| &mut s.name);
///     }
/// }
/// ```
pub trait Reflect: Any + Clone + Default + PartialEq + fmt::Debug + Send + Sync {
    /// Canonical (persisted) type name
    const NAME: &'static str;

    /// Abstract classes are registered without a factory
    const ABSTRACT: bool = false;

    /// Declare the fields of this type, called once at registration
    fn enumerate(_comp: &mut Compositor<Self>) {}

    /// Migrate data read from an archive written by an older version
    fn upgrade(&mut self, _from: &Version) {}

    /// Called once all fields of a freshly read object have been applied
    fn post_deserialize(&mut self) {}
}

/// Dynamically typed view of a reflected object
pub trait Object: Any + Send + Sync + fmt::Debug {
    /// Canonical name of the object's class
    fn class_name(&self) -> &'static str;

    /// Id of the object's class
    fn reflect_type(&self) -> TypeId {
        TypeId::of_name(self.class_name())
    }

    /// Deep copy
    fn clone_object(&self) -> ObjectPtr;

    /// Value equality against another object of any class
    fn equals_object(&self, other: &dyn Object) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Forwarded to [`Reflect::upgrade`]
    fn upgrade_object(&mut self, from: &Version);

    /// Forwarded to [`Reflect::post_deserialize`]
    fn post_deserialize_object(&mut self);
}

impl<T: Reflect> Object for T {
    fn class_name(&self) -> &'static str {
        T::NAME
    }

    fn clone_object(&self) -> ObjectPtr {
        Box::new(self.clone())
    }

    fn equals_object(&self, other: &dyn Object) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn upgrade_object(&mut self, from: &Version) {
        self.upgrade(from);
    }

    fn post_deserialize_object(&mut self) {
        self.post_deserialize();
    }
}

impl dyn Object {
    /// Check if the object is exactly a `T`
    pub fn is<T: Reflect>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcast to a concrete type
    pub fn downcast_ref<T: Reflect>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Downcast to a mutable concrete type
    pub fn downcast_mut<T: Reflect>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

/// Take ownership of the concrete value behind an [`ObjectPtr`]
///
/// Returns the pointer unchanged when it holds some other class.
pub fn downcast_object<T: Reflect>(object: ObjectPtr) -> Result<Box<T>, ObjectPtr> {
    if object.is::<T>() {
        match object.into_any().downcast::<T>() {
            Ok(concrete) => Ok(concrete),
            // checked above
            Err(_) => unreachable!("object type changed during downcast"),
        }
    } else {
        Err(object)
    }
}

impl Clone for Box<dyn Object> {
    fn clone(&self) -> Self {
        self.clone_object()
    }
}

impl PartialEq for dyn Object {
    fn eq(&self, other: &Self) -> bool {
        self.equals_object(other)
    }
}

/// Id of a reflected type without consulting the registry
#[inline]
pub fn type_id_of<T: Reflect>() -> TypeId {
    TypeId::of_name(T::NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Gadget {
        value: i32,
    }

    impl Reflect for Gadget {
        const NAME: &'static str = "Gadget";
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Other;

    impl Reflect for Other {
        const NAME: &'static str = "Other";
    }

    #[test]
    fn test_object_identity_and_downcast() {
        let mut obj: ObjectPtr = Box::new(Gadget { value: 3 });
        assert_eq!(obj.class_name(), "Gadget");
        assert_eq!(obj.reflect_type(), type_id_of::<Gadget>());
        assert!(obj.is::<Gadget>());
        assert!(!obj.is::<Other>());

        obj.downcast_mut::<Gadget>().unwrap().value = 9;
        assert_eq!(obj.downcast_ref::<Gadget>().unwrap().value, 9);
    }

    #[test]
    fn test_clone_and_equality() {
        let a: ObjectPtr = Box::new(Gadget { value: 1 });
        let b = a.clone();
        assert!(a == b);

        let c: ObjectPtr = Box::new(Other);
        assert!(a != c);
    }

    #[test]
    fn test_downcast_object() {
        let obj: ObjectPtr = Box::new(Gadget { value: 5 });
        let obj = downcast_object::<Other>(obj).unwrap_err();
        let gadget = downcast_object::<Gadget>(obj).unwrap();
        assert_eq!(gadget.value, 5);
    }
}
