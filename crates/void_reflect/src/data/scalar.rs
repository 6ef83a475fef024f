//! Scalar, string, path, tuid and enumeration serializers

use super::Data;
use crate::archive::binary::{BinaryReader, BinaryWriter};
use crate::archive::xml::{XmlNode, XmlReader, XmlWriter};
use crate::enumeration::Enumeration;
use crate::error::{ReflectError, Result};
use crate::registry::Registry;
use crate::value::{DataKind, DataTag, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use void_core::Tuid;

macro_rules! scalar_data {
    ($($name:ident: $ty:ty => $variant:ident),* $(,)?) => {
        $(
            #[doc = concat!("Serializer for `", stringify!($ty), "` fields")]
            pub struct $name;

            impl Data for $name {
                fn tag(&self) -> DataTag {
                    DataTag::$variant
                }

                fn write_binary(&self, out: &mut BinaryWriter<'_>, _kind: &DataKind, value: &Value) -> Result<()> {
                    match value {
                        Value::$variant(v) => out.encode(v),
                        other => Err(ReflectError::mismatch(stringify!($ty), other.type_name())),
                    }
                }

                fn read_binary(&self, input: &mut BinaryReader<'_, '_>, _kind: &DataKind) -> Result<Value> {
                    input.decode::<$ty>().map(Value::$variant)
                }

                fn write_xml(&self, _out: &mut XmlWriter<'_>, _kind: &DataKind, value: &Value, node: &mut XmlNode) -> Result<()> {
                    match value {
                        Value::$variant(v) => {
                            node.text = v.to_string();
                            Ok(())
                        }
                        other => Err(ReflectError::mismatch(stringify!($ty), other.type_name())),
                    }
                }

                fn read_xml(&self, _input: &mut XmlReader<'_>, _kind: &DataKind, node: &XmlNode) -> Result<Value> {
                    node.text
                        .trim()
                        .parse::<$ty>()
                        .map(Value::$variant)
                        .map_err(|_| ReflectError::mismatch(stringify!($ty), format!("'{}'", node.text)))
                }
            }
        )*
    };
}

scalar_data! {
    BoolData: bool => Bool,
    U8Data: u8 => U8,
    I8Data: i8 => I8,
    U16Data: u16 => U16,
    I16Data: i16 => I16,
    U32Data: u32 => U32,
    I32Data: i32 => I32,
    U64Data: u64 => U64,
    I64Data: i64 => I64,
    F32Data: f32 => F32,
    F64Data: f64 => F64,
    TuidData: Tuid => Tuid,
}

/// Serializer for `String` fields
pub struct StringData;

impl Data for StringData {
    fn tag(&self) -> DataTag {
        DataTag::String
    }

    fn write_binary(&self, out: &mut BinaryWriter<'_>, _kind: &DataKind, value: &Value) -> Result<()> {
        match value {
            Value::String(v) => out.encode(v),
            other => Err(ReflectError::mismatch("string", other.type_name())),
        }
    }

    fn read_binary(&self, input: &mut BinaryReader<'_, '_>, _kind: &DataKind) -> Result<Value> {
        input.decode::<String>().map(Value::String)
    }

    fn write_xml(&self, _out: &mut XmlWriter<'_>, _kind: &DataKind, value: &Value, node: &mut XmlNode) -> Result<()> {
        match value {
            Value::String(v) => {
                node.text = v.clone();
                Ok(())
            }
            other => Err(ReflectError::mismatch("string", other.type_name())),
        }
    }

    // text is taken verbatim, whitespace is significant
    fn read_xml(&self, _input: &mut XmlReader<'_>, _kind: &DataKind, node: &XmlNode) -> Result<Value> {
        Ok(Value::String(node.text.clone()))
    }
}

/// Serializer for `PathBuf` fields, stored as UTF-8 with `/` separators
pub struct PathData;

fn portable(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

impl Data for PathData {
    fn tag(&self) -> DataTag {
        DataTag::Path
    }

    fn write_binary(&self, out: &mut BinaryWriter<'_>, _kind: &DataKind, value: &Value) -> Result<()> {
        match value {
            Value::Path(v) => out.encode(&portable(v)),
            other => Err(ReflectError::mismatch("path", other.type_name())),
        }
    }

    fn read_binary(&self, input: &mut BinaryReader<'_, '_>, _kind: &DataKind) -> Result<Value> {
        input.decode::<String>().map(|s| Value::Path(PathBuf::from(s)))
    }

    fn write_xml(&self, _out: &mut XmlWriter<'_>, _kind: &DataKind, value: &Value, node: &mut XmlNode) -> Result<()> {
        match value {
            Value::Path(v) => {
                node.text = portable(v);
                Ok(())
            }
            other => Err(ReflectError::mismatch("path", other.type_name())),
        }
    }

    fn read_xml(&self, _input: &mut XmlReader<'_>, _kind: &DataKind, node: &XmlNode) -> Result<Value> {
        Ok(Value::Path(PathBuf::from(node.text.trim())))
    }
}

/// Serializer for enumeration fields, persisted by element name
pub struct EnumerationData;

fn enumeration_for(registry: &Registry, kind: &DataKind) -> Result<Arc<Enumeration>> {
    match kind {
        DataKind::Enumeration(name) => registry
            .get_enumeration_by_name(name)
            .ok_or_else(|| ReflectError::UnknownType(name.clone())),
        other => Err(ReflectError::mismatch("enumeration", other.to_string())),
    }
}

fn name_of(enumeration: &Enumeration, value: &Value) -> Result<String> {
    match value {
        Value::Enum(raw) => enumeration
            .element_by_value(*raw)
            .map(|e| e.name.clone())
            .ok_or_else(|| ReflectError::mismatch(enumeration.name(), format!("value {}", raw))),
        other => Err(ReflectError::mismatch(enumeration.name(), other.type_name())),
    }
}

fn value_of(enumeration: &Enumeration, name: &str) -> Result<Value> {
    enumeration
        .element_by_name(name)
        .or_else(|| {
            enumeration
                .elements()
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(name))
        })
        .map(|e| Value::Enum(e.value))
        .ok_or_else(|| ReflectError::mismatch(enumeration.name(), format!("'{}'", name)))
}

impl Data for EnumerationData {
    fn tag(&self) -> DataTag {
        DataTag::Enumeration
    }

    fn write_binary(&self, out: &mut BinaryWriter<'_>, kind: &DataKind, value: &Value) -> Result<()> {
        let enumeration = enumeration_for(out.registry(), kind)?;
        let name = name_of(&enumeration, value)?;
        out.encode(&name)
    }

    fn read_binary(&self, input: &mut BinaryReader<'_, '_>, kind: &DataKind) -> Result<Value> {
        let enumeration = enumeration_for(input.registry(), kind)?;
        let name = input.decode::<String>()?;
        value_of(&enumeration, &name)
    }

    fn write_xml(&self, out: &mut XmlWriter<'_>, kind: &DataKind, value: &Value, node: &mut XmlNode) -> Result<()> {
        let enumeration = enumeration_for(out.registry(), kind)?;
        node.text = name_of(&enumeration, value)?;
        Ok(())
    }

    fn read_xml(&self, input: &mut XmlReader<'_>, kind: &DataKind, node: &XmlNode) -> Result<Value> {
        let enumeration = enumeration_for(input.registry(), kind)?;
        value_of(&enumeration, node.text.trim())
    }
}
