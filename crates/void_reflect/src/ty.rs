//! Type identity
//!
//! Every registered class or enumeration is a [`Type`] with a [`TypeId`]
//! derived from the CRC-32 of its canonical name. The id is therefore known
//! without consulting the registry, which keeps hot-path identity checks
//! free of map lookups.

use crate::class::Class;
use crate::enumeration::Enumeration;
use core::fmt;
use std::sync::Arc;

/// Numeric identity of a registered type
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Reserved id that never names a type
    pub const INVALID: Self = Self(0);

    /// Derive the id for a canonical type name
    pub fn of_name(name: &str) -> Self {
        let crc = crc32fast::hash(name.as_bytes());
        // zero is reserved
        Self(if crc == 0 { 1 } else { crc })
    }

    /// Get the raw value
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Check if this is a valid id
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({:#010x})", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// What kind of type a [`Type`] describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReflectionKind {
    Class,
    Enumeration,
}

/// A registered type
#[derive(Clone, Debug)]
pub enum Type {
    Class(Arc<Class>),
    Enumeration(Arc<Enumeration>),
}

impl Type {
    pub fn id(&self) -> TypeId {
        match self {
            Type::Class(c) => c.id(),
            Type::Enumeration(e) => e.id(),
        }
    }

    /// Canonical name (the persisted one)
    pub fn name(&self) -> &str {
        match self {
            Type::Class(c) => c.name(),
            Type::Enumeration(e) => e.name(),
        }
    }

    pub fn short_name(&self) -> &str {
        match self {
            Type::Class(c) => c.short_name(),
            Type::Enumeration(e) => e.short_name(),
        }
    }

    pub fn ui_name(&self) -> &str {
        match self {
            Type::Class(c) => c.ui_name(),
            Type::Enumeration(e) => e.short_name(),
        }
    }

    pub fn kind(&self) -> ReflectionKind {
        match self {
            Type::Class(_) => ReflectionKind::Class,
            Type::Enumeration(_) => ReflectionKind::Enumeration,
        }
    }

    pub fn as_class(&self) -> Option<&Arc<Class>> {
        match self {
            Type::Class(c) => Some(c),
            Type::Enumeration(_) => None,
        }
    }

    pub fn as_enumeration(&self) -> Option<&Arc<Enumeration>> {
        match self {
            Type::Enumeration(e) => Some(e),
            Type::Class(_) => None,
        }
    }

    /// True when both handles refer to the same registered object
    pub fn ptr_eq(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Class(a), Type::Class(b)) => Arc::ptr_eq(a, b),
            (Type::Enumeration(a), Type::Enumeration(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Metadata equality, used to make repeated registration idempotent
    pub fn same_definition(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Class(a), Type::Class(b)) => a.same_definition(b),
            (Type::Enumeration(a), Type::Enumeration(b)) => a.same_definition(b),
            _ => false,
        }
    }
}

/// Strip a module path (`a::b::Foo` → `Foo`)
pub fn shorten_name(name: &str) -> &str {
    // generic arguments may contain paths too, only look before them
    let head = name.find('<').map(|i| &name[..i]).unwrap_or(name);
    match head.rfind("::") {
        Some(i) => &name[i + 2..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_from_name() {
        let a = TypeId::of_name("Foo");
        assert_eq!(a, TypeId::of_name("Foo"));
        assert_ne!(a, TypeId::of_name("Bar"));
        assert!(a.is_valid());
        assert!(!TypeId::INVALID.is_valid());
    }

    #[test]
    fn test_shorten_name() {
        assert_eq!(shorten_name("Foo"), "Foo");
        assert_eq!(shorten_name("scene::node::Transform"), "Transform");
        assert_eq!(shorten_name("assets::Handle<mesh::Mesh>"), "Handle<mesh::Mesh>");
    }
}
