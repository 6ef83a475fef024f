//! Dynamic field values
//!
//! Values are the type-erased representation of a single field. Field
//! accessors read a member into a [`Value`] and write one back, serializers
//! move values to and from archives, and default diffing compares them.

use crate::error::{ReflectError, Result};
use crate::object::{Object, ObjectPtr};
use core::fmt;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use void_core::Tuid;

/// Shape of the data held by a field
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataKind {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    String,
    Path,
    Tuid,
    /// Value of a registered enumeration, by enumeration name
    Enumeration(String),
    /// Owned nested object, serialized with its own type name
    Element,
    Array(Box<DataKind>),
    Set(Box<DataKind>),
    Map(Box<DataKind>, Box<DataKind>),
}

/// Serializer lookup key, a [`DataKind`] without its parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataTag {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    String,
    Path,
    Tuid,
    Enumeration,
    Element,
    Array,
    Set,
    Map,
}

impl DataTag {
    /// Name of the serializer that handles this tag
    pub fn name(&self) -> &'static str {
        match self {
            DataTag::Bool => "Bool",
            DataTag::U8 => "UInt8",
            DataTag::I8 => "Int8",
            DataTag::U16 => "UInt16",
            DataTag::I16 => "Int16",
            DataTag::U32 => "UInt32",
            DataTag::I32 => "Int32",
            DataTag::U64 => "UInt64",
            DataTag::I64 => "Int64",
            DataTag::F32 => "Float32",
            DataTag::F64 => "Float64",
            DataTag::String => "String",
            DataTag::Path => "Path",
            DataTag::Tuid => "Tuid",
            DataTag::Enumeration => "Enumeration",
            DataTag::Element => "Element",
            DataTag::Array => "Array",
            DataTag::Set => "Set",
            DataTag::Map => "Map",
        }
    }
}

impl DataKind {
    pub fn tag(&self) -> DataTag {
        match self {
            DataKind::Bool => DataTag::Bool,
            DataKind::U8 => DataTag::U8,
            DataKind::I8 => DataTag::I8,
            DataKind::U16 => DataTag::U16,
            DataKind::I16 => DataTag::I16,
            DataKind::U32 => DataTag::U32,
            DataKind::I32 => DataTag::I32,
            DataKind::U64 => DataTag::U64,
            DataKind::I64 => DataTag::I64,
            DataKind::F32 => DataTag::F32,
            DataKind::F64 => DataTag::F64,
            DataKind::String => DataTag::String,
            DataKind::Path => DataTag::Path,
            DataKind::Tuid => DataTag::Tuid,
            DataKind::Enumeration(_) => DataTag::Enumeration,
            DataKind::Element => DataTag::Element,
            DataKind::Array(_) => DataTag::Array,
            DataKind::Set(_) => DataTag::Set,
            DataKind::Map(_, _) => DataTag::Map,
        }
    }

    /// Scalar kind whose serializer is called `name`, see [`DataTag::name`]
    pub fn scalar_named(name: &str) -> Option<DataKind> {
        Some(match name {
            "Bool" => DataKind::Bool,
            "UInt8" => DataKind::U8,
            "Int8" => DataKind::I8,
            "UInt16" => DataKind::U16,
            "Int16" => DataKind::I16,
            "UInt32" => DataKind::U32,
            "Int32" => DataKind::I32,
            "UInt64" => DataKind::U64,
            "Int64" => DataKind::I64,
            "Float32" => DataKind::F32,
            "Float64" => DataKind::F64,
            "String" => DataKind::String,
            "Path" => DataKind::Path,
            "Tuid" => DataKind::Tuid,
            _ => return None,
        })
    }

    pub fn is_container(&self) -> bool {
        matches!(self, DataKind::Array(_) | DataKind::Set(_) | DataKind::Map(_, _))
    }

    /// Enumeration names referenced anywhere in this kind
    pub fn enumerations(&self) -> Vec<&str> {
        match self {
            DataKind::Enumeration(name) => vec![name.as_str()],
            DataKind::Array(item) | DataKind::Set(item) => item.enumerations(),
            DataKind::Map(key, value) => {
                let mut names = key.enumerations();
                names.extend(value.enumerations());
                names
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Enumeration(name) => write!(f, "Enumeration<{}>", name),
            DataKind::Array(item) => write!(f, "Array<{}>", item),
            DataKind::Set(item) => write!(f, "Set<{}>", item),
            DataKind::Map(key, value) => write!(f, "Map<{}, {}>", key, value),
            other => write!(f, "{}", other.tag().name()),
        }
    }
}

/// A dynamic value of one field
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Path(PathBuf),
    Tuid(Tuid),
    /// Enumeration value (the integer, the name is resolved on write)
    Enum(i32),
    Element(Option<ObjectPtr>),
    Array(Vec<Value>),
    /// Ordered, duplicate free
    Set(Vec<Value>),
    /// Ordered by key
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Get type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::U8(_) => "u8",
            Value::I8(_) => "i8",
            Value::U16(_) => "u16",
            Value::I16(_) => "i16",
            Value::U32(_) => "u32",
            Value::I32(_) => "i32",
            Value::U64(_) => "u64",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Path(_) => "path",
            Value::Tuid(_) => "tuid",
            Value::Enum(_) => "enumeration",
            Value::Element(_) => "element",
            Value::Array(_) => "array",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    /// Containers with no items
    pub fn is_empty_container(&self) -> bool {
        match self {
            Value::Array(items) | Value::Set(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get any integer as i64
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::U8(v) => Some(v as i64),
            Value::I8(v) => Some(v as i64),
            Value::U16(v) => Some(v as i64),
            Value::I16(v) => Some(v as i64),
            Value::U32(v) => Some(v as i64),
            Value::I32(v) => Some(v as i64),
            Value::U64(v) => i64::try_from(v).ok(),
            Value::I64(v) => Some(v),
            Value::Enum(v) => Some(v as i64),
            _ => None,
        }
    }

    /// Convert a scalar to another scalar kind
    ///
    /// Numbers convert when the value fits the target exactly (floats
    /// narrow to the nearest representable value), strings and paths
    /// convert into each other. Anything else yields `None`.
    pub fn cast(self, kind: &DataKind) -> Option<Value> {
        match self {
            Value::Bool(v) => Value::from_integer(v as i128, kind),
            Value::F32(v) => Value::from_float(v as f64, kind),
            Value::F64(v) => Value::from_float(v, kind),
            Value::String(v) => match kind {
                DataKind::String => Some(Value::String(v)),
                DataKind::Path => Some(Value::Path(PathBuf::from(v))),
                _ => None,
            },
            Value::Path(v) => match kind {
                DataKind::Path => Some(Value::Path(v)),
                DataKind::String => v.into_os_string().into_string().ok().map(Value::String),
                _ => None,
            },
            Value::U64(v) => Value::from_integer(v as i128, kind),
            Value::Enum(_) => None,
            other => other.as_i64().and_then(|v| Value::from_integer(v as i128, kind)),
        }
    }

    fn from_integer(v: i128, kind: &DataKind) -> Option<Value> {
        Some(match kind {
            DataKind::Bool => Value::Bool(v != 0),
            DataKind::U8 => Value::U8(u8::try_from(v).ok()?),
            DataKind::I8 => Value::I8(i8::try_from(v).ok()?),
            DataKind::U16 => Value::U16(u16::try_from(v).ok()?),
            DataKind::I16 => Value::I16(i16::try_from(v).ok()?),
            DataKind::U32 => Value::U32(u32::try_from(v).ok()?),
            DataKind::I32 => Value::I32(i32::try_from(v).ok()?),
            DataKind::U64 => Value::U64(u64::try_from(v).ok()?),
            DataKind::I64 => Value::I64(i64::try_from(v).ok()?),
            DataKind::F32 => Value::F32(v as f32),
            DataKind::F64 => Value::F64(v as f64),
            _ => return None,
        })
    }

    fn from_float(v: f64, kind: &DataKind) -> Option<Value> {
        match kind {
            DataKind::F32 => Some(Value::F32(v as f32)),
            DataKind::F64 => Some(Value::F64(v)),
            // integers only take whole numbers
            _ if v.is_finite() && v.fract() == 0.0 => Value::from_integer(v as i128, kind),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Get the nested element
    pub fn as_element(&self) -> Option<&ObjectPtr> {
        match self {
            Value::Element(Some(obj)) => Some(obj),
            _ => None,
        }
    }
}

/// A Rust type that can be bound to a reflected field
pub trait FieldValue: Sized + Send + Sync + 'static {
    /// Data kind of fields of this type
    fn kind() -> DataKind;

    /// Read into a dynamic value
    fn to_value(&self) -> Value;

    /// Build from a dynamic value
    fn from_value(value: Value) -> Result<Self>;

    /// Visit the nested objects this value owns
    fn for_each_element(&self, _f: &mut dyn FnMut(&dyn Object)) {}
}

macro_rules! scalar_field_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn kind() -> DataKind {
                    DataKind::$variant
                }

                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(ReflectError::mismatch(stringify!($ty), other.type_name())),
                    }
                }
            }
        )*
    };
}

scalar_field_value! {
    bool => Bool,
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => String,
    PathBuf => Path,
    Tuid => Tuid,
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn kind() -> DataKind {
        DataKind::Array(Box::new(T::kind()))
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) | Value::Set(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(ReflectError::mismatch("array", other.type_name())),
        }
    }

    fn for_each_element(&self, f: &mut dyn FnMut(&dyn Object)) {
        for item in self {
            item.for_each_element(f);
        }
    }
}

impl<T: FieldValue + Ord> FieldValue for BTreeSet<T> {
    fn kind() -> DataKind {
        DataKind::Set(Box::new(T::kind()))
    }

    fn to_value(&self) -> Value {
        Value::Set(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Set(items) | Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(ReflectError::mismatch("set", other.type_name())),
        }
    }

    fn for_each_element(&self, f: &mut dyn FnMut(&dyn Object)) {
        for item in self {
            item.for_each_element(f);
        }
    }
}

impl<K: FieldValue + Ord, V: FieldValue> FieldValue for BTreeMap<K, V> {
    fn kind() -> DataKind {
        DataKind::Map(Box::new(K::kind()), Box::new(V::kind()))
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(ReflectError::mismatch("map", other.type_name())),
        }
    }

    fn for_each_element(&self, f: &mut dyn FnMut(&dyn Object)) {
        for (key, value) in self {
            key.for_each_element(f);
            value.for_each_element(f);
        }
    }
}

impl FieldValue for ObjectPtr {
    fn kind() -> DataKind {
        DataKind::Element
    }

    fn to_value(&self) -> Value {
        Value::Element(Some(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Element(Some(obj)) => Ok(obj),
            Value::Element(None) => Err(ReflectError::mismatch("element", "null element")),
            other => Err(ReflectError::mismatch("element", other.type_name())),
        }
    }

    fn for_each_element(&self, f: &mut dyn FnMut(&dyn Object)) {
        f(&**self);
    }
}

impl FieldValue for Option<ObjectPtr> {
    fn kind() -> DataKind {
        DataKind::Element
    }

    fn to_value(&self) -> Value {
        Value::Element(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Element(obj) => Ok(obj),
            other => Err(ReflectError::mismatch("element", other.type_name())),
        }
    }

    fn for_each_element(&self, f: &mut dyn FnMut(&dyn Object)) {
        if let Some(obj) = self {
            f(&**obj);
        }
    }
}
