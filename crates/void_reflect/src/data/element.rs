//! Nested element serializer
//!
//! Element fields own another reflected object. The object is written as a
//! full element record (type name plus fields), which is how object graphs
//! are persisted. A missing optional element is written as a null record.

use super::Data;
use crate::archive::binary::{BinaryReader, BinaryWriter};
use crate::archive::xml::{XmlNode, XmlReader, XmlWriter};
use crate::error::{ReflectError, Result};
use crate::value::{DataKind, DataTag, Value};

/// Serializer for `ObjectPtr` and `Option<ObjectPtr>` fields
pub struct ElementData;

impl Data for ElementData {
    fn tag(&self) -> DataTag {
        DataTag::Element
    }

    fn write_binary(&self, out: &mut BinaryWriter<'_>, _kind: &DataKind, value: &Value) -> Result<()> {
        match value {
            Value::Element(element) => out.write_element(element.as_deref()),
            other => Err(ReflectError::mismatch("element", other.type_name())),
        }
    }

    fn read_binary(&self, input: &mut BinaryReader<'_, '_>, _kind: &DataKind) -> Result<Value> {
        input.read_element().map(Value::Element)
    }

    fn write_xml(&self, out: &mut XmlWriter<'_>, _kind: &DataKind, value: &Value, node: &mut XmlNode) -> Result<()> {
        match value {
            Value::Element(element) => {
                let child = out.write_element(element.as_deref())?;
                node.children.push(child);
                Ok(())
            }
            other => Err(ReflectError::mismatch("element", other.type_name())),
        }
    }

    fn read_xml(&self, input: &mut XmlReader<'_>, _kind: &DataKind, node: &XmlNode) -> Result<Value> {
        match node.children.first() {
            Some(child) => input.read_element(child).map(Value::Element),
            None => Ok(Value::Element(None)),
        }
    }
}
