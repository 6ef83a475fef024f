//! Reflected enumerations
//!
//! An [`Enumeration`] is an ordered set of named integer constants. Rust
//! enums opt in through [`ReflectEnum`], usually generated by
//! [`impl_enumeration!`](crate::impl_enumeration).

use crate::error::{ReflectError, Result};
use crate::ty::{shorten_name, TypeId};

/// One named constant
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumerationElement {
    pub value: i32,
    pub name: String,
    pub label: String,
}

/// Registered enumeration metadata
#[derive(Debug)]
pub struct Enumeration {
    id: TypeId,
    name: String,
    short_name: String,
    elements: Vec<EnumerationElement>,
}

impl Enumeration {
    pub fn new(name: &str) -> Self {
        Self {
            id: TypeId::of_name(name),
            name: name.to_string(),
            short_name: shorten_name(name).to_string(),
            elements: Vec::new(),
        }
    }

    /// Build the enumeration described by `E`
    pub fn of<E: ReflectEnum>() -> Result<Self> {
        let mut enumeration = Self::new(E::NAME);
        E::enumerate(&mut enumeration);
        enumeration.validate()?;
        Ok(enumeration)
    }

    /// Override the short name
    pub fn with_short_name(mut self, short_name: &str) -> Self {
        self.short_name = short_name.to_string();
        self
    }

    /// Append a constant
    pub fn add(&mut self, value: i32, name: &str, label: &str) -> &mut Self {
        self.elements.push(EnumerationElement {
            value,
            name: name.to_string(),
            label: label.to_string(),
        });
        self
    }

    /// Reject duplicate names
    pub fn validate(&self) -> Result<()> {
        for (i, element) in self.elements.iter().enumerate() {
            if self.elements[..i].iter().any(|e| e.name == element.name) {
                return Err(ReflectError::DuplicateEnumerationElement {
                    enumeration: self.name.clone(),
                    element: element.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn elements(&self) -> &[EnumerationElement] {
        &self.elements
    }

    pub fn element_by_value(&self, value: i32) -> Option<&EnumerationElement> {
        self.elements.iter().find(|e| e.value == value)
    }

    pub fn element_by_name(&self, name: &str) -> Option<&EnumerationElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn is_valid_value(&self, value: i32) -> bool {
        self.element_by_value(value).is_some()
    }

    pub(crate) fn same_definition(&self, other: &Enumeration) -> bool {
        self.name == other.name && self.short_name == other.short_name && self.elements == other.elements
    }
}

/// Trait implemented by reflected Rust enums
pub trait ReflectEnum: Copy + Send + Sync + 'static {
    /// Canonical enumeration name
    const NAME: &'static str;

    /// Declare the constants
    fn enumerate(enumeration: &mut Enumeration);

    fn to_i32(self) -> i32;

    fn from_i32(value: i32) -> Option<Self>;
}

/// Implement [`ReflectEnum`] and [`FieldValue`](crate::FieldValue) for a
/// fieldless enum
///
/// ```ignore
/// #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// enum BlendMode {
///     #[default]
///     Opaque = 0,
///     Additive = 4,
/// }
///
/// impl_enumeration!(BlendMode, "BlendMode", {
///     Opaque => "Opaque",
///     Additive => "Additive Blending",
/// });
/// ```
#[macro_export]
macro_rules! impl_enumeration {
    ($ty:ty, $name:expr, { $($variant:ident => $label:expr),* $(,)? }) => {
        impl $crate::ReflectEnum for $ty {
            const NAME: &'static str = $name;

            fn enumerate(enumeration: &mut $crate::Enumeration) {
                $( enumeration.add(<$ty>::$variant as i32, stringify!($variant), $label); )*
            }

            fn to_i32(self) -> i32 {
                self as i32
            }

            fn from_i32(value: i32) -> Option<Self> {
                $( if value == <$ty>::$variant as i32 { return Some(<$ty>::$variant); } )*
                None
            }
        }

        impl $crate::FieldValue for $ty {
            fn kind() -> $crate::DataKind {
                $crate::DataKind::Enumeration(<$ty as $crate::ReflectEnum>::NAME.to_string())
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Enum($crate::ReflectEnum::to_i32(*self))
            }

            fn from_value(value: $crate::Value) -> $crate::Result<Self> {
                match value {
                    $crate::Value::Enum(raw) => <$ty as $crate::ReflectEnum>::from_i32(raw).ok_or_else(|| {
                        $crate::ReflectError::mismatch(
                            <$ty as $crate::ReflectEnum>::NAME,
                            format!("value {}", raw),
                        )
                    }),
                    other => Err($crate::ReflectError::mismatch(
                        <$ty as $crate::ReflectEnum>::NAME,
                        other.type_name(),
                    )),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{DataKind, FieldValue, Value};

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    enum Filter {
        #[default]
        Point = 0,
        Linear = 2,
        Anisotropic = 7,
    }

    crate::impl_enumeration!(Filter, "Filter", {
        Point => "Point",
        Linear => "Linear",
        Anisotropic => "Anisotropic (x16)",
    });

    #[test]
    fn test_non_contiguous_values() {
        let e = Enumeration::of::<Filter>().unwrap();
        assert_eq!(e.elements().len(), 3);
        assert_eq!(e.element_by_value(7).unwrap().name, "Anisotropic");
        assert_eq!(e.element_by_name("Linear").unwrap().value, 2);
        assert!(!e.is_valid_value(1));
        assert_eq!(e.element_by_value(7).unwrap().label, "Anisotropic (x16)");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut e = Enumeration::new("Broken");
        e.add(0, "A", "A").add(1, "A", "Again");
        assert!(matches!(
            e.validate(),
            Err(ReflectError::DuplicateEnumerationElement { .. })
        ));
    }

    #[test]
    fn test_field_value_conversion() {
        assert_eq!(Filter::kind(), DataKind::Enumeration("Filter".into()));
        assert_eq!(Filter::Linear.to_value(), Value::Enum(2));
        assert_eq!(Filter::from_value(Value::Enum(7)).unwrap(), Filter::Anisotropic);
        assert!(Filter::from_value(Value::Enum(3)).is_err());
    }
}
