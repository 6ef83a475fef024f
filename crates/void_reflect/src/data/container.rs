//! Array, set and map serializers
//!
//! Binary form is a `u32` item count followed by the items, each written by
//! the serializer of the item kind. XML form is one `<Item>` per item, or one
//! `<Entry><Key/><Value/></Entry>` per map entry.

use super::Data;
use crate::archive::binary::{BinaryReader, BinaryWriter};
use crate::archive::xml::{XmlNode, XmlReader, XmlWriter};
use crate::error::{ReflectError, Result};
use crate::value::{DataKind, DataTag, Value};

fn item_kind<'k>(kind: &'k DataKind, expected: &str) -> Result<&'k DataKind> {
    match kind {
        DataKind::Array(item) | DataKind::Set(item) => Ok(&**item),
        other => Err(ReflectError::mismatch(expected, other.to_string())),
    }
}

fn items<'v>(value: &'v Value, expected: &str) -> Result<&'v [Value]> {
    match value {
        Value::Array(items) | Value::Set(items) => Ok(items.as_slice()),
        other => Err(ReflectError::mismatch(expected, other.type_name())),
    }
}

fn count_of(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ReflectError::format(format!("container of {} items is too large", len)))
}

fn write_items_binary(out: &mut BinaryWriter<'_>, kind: &DataKind, items: &[Value]) -> Result<()> {
    out.write_u32(count_of(items.len())?);
    items.iter().try_for_each(|item| out.write_value(kind, item))
}

fn read_items_binary(input: &mut BinaryReader<'_, '_>, kind: &DataKind) -> Result<Vec<Value>> {
    let count = input.read_count()?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(input.read_value(kind)?);
    }
    Ok(items)
}

fn write_items_xml(out: &mut XmlWriter<'_>, kind: &DataKind, items: &[Value], node: &mut XmlNode) -> Result<()> {
    for item in items {
        let mut child = XmlNode::new("Item");
        out.write_value(kind, item, &mut child)?;
        node.children.push(child);
    }
    Ok(())
}

fn read_items_xml(input: &mut XmlReader<'_>, kind: &DataKind, node: &XmlNode) -> Result<Vec<Value>> {
    node.children_named("Item")
        .map(|child| input.read_value(kind, child))
        .collect()
}

/// Serializer for `Vec<T>` fields
pub struct ArrayData;

impl Data for ArrayData {
    fn tag(&self) -> DataTag {
        DataTag::Array
    }

    fn write_binary(&self, out: &mut BinaryWriter<'_>, kind: &DataKind, value: &Value) -> Result<()> {
        write_items_binary(out, item_kind(kind, "array")?, items(value, "array")?)
    }

    fn read_binary(&self, input: &mut BinaryReader<'_, '_>, kind: &DataKind) -> Result<Value> {
        read_items_binary(input, item_kind(kind, "array")?).map(Value::Array)
    }

    fn write_xml(&self, out: &mut XmlWriter<'_>, kind: &DataKind, value: &Value, node: &mut XmlNode) -> Result<()> {
        write_items_xml(out, item_kind(kind, "array")?, items(value, "array")?, node)
    }

    fn read_xml(&self, input: &mut XmlReader<'_>, kind: &DataKind, node: &XmlNode) -> Result<Value> {
        read_items_xml(input, item_kind(kind, "array")?, node).map(Value::Array)
    }
}

/// Serializer for `BTreeSet<T>` fields
pub struct SetData;

impl Data for SetData {
    fn tag(&self) -> DataTag {
        DataTag::Set
    }

    fn write_binary(&self, out: &mut BinaryWriter<'_>, kind: &DataKind, value: &Value) -> Result<()> {
        write_items_binary(out, item_kind(kind, "set")?, items(value, "set")?)
    }

    fn read_binary(&self, input: &mut BinaryReader<'_, '_>, kind: &DataKind) -> Result<Value> {
        read_items_binary(input, item_kind(kind, "set")?).map(Value::Set)
    }

    fn write_xml(&self, out: &mut XmlWriter<'_>, kind: &DataKind, value: &Value, node: &mut XmlNode) -> Result<()> {
        write_items_xml(out, item_kind(kind, "set")?, items(value, "set")?, node)
    }

    fn read_xml(&self, input: &mut XmlReader<'_>, kind: &DataKind, node: &XmlNode) -> Result<Value> {
        read_items_xml(input, item_kind(kind, "set")?, node).map(Value::Set)
    }
}

/// Serializer for `BTreeMap<K, V>` fields
pub struct MapData;

fn entry_kinds<'k>(kind: &'k DataKind) -> Result<(&'k DataKind, &'k DataKind)> {
    match kind {
        DataKind::Map(key, value) => Ok((&**key, &**value)),
        other => Err(ReflectError::mismatch("map", other.to_string())),
    }
}

fn entries(value: &Value) -> Result<&[(Value, Value)]> {
    match value {
        Value::Map(entries) => Ok(entries.as_slice()),
        other => Err(ReflectError::mismatch("map", other.type_name())),
    }
}

impl Data for MapData {
    fn tag(&self) -> DataTag {
        DataTag::Map
    }

    fn write_binary(&self, out: &mut BinaryWriter<'_>, kind: &DataKind, value: &Value) -> Result<()> {
        let (key_kind, value_kind) = entry_kinds(kind)?;
        let entries = entries(value)?;
        out.write_u32(count_of(entries.len())?);
        for (key, item) in entries {
            out.write_value(key_kind, key)?;
            out.write_value(value_kind, item)?;
        }
        Ok(())
    }

    fn read_binary(&self, input: &mut BinaryReader<'_, '_>, kind: &DataKind) -> Result<Value> {
        let (key_kind, value_kind) = entry_kinds(kind)?;
        let count = input.read_count()?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let key = input.read_value(key_kind)?;
            let item = input.read_value(value_kind)?;
            entries.push((key, item));
        }
        Ok(Value::Map(entries))
    }

    fn write_xml(&self, out: &mut XmlWriter<'_>, kind: &DataKind, value: &Value, node: &mut XmlNode) -> Result<()> {
        let (key_kind, value_kind) = entry_kinds(kind)?;
        for (key, item) in entries(value)? {
            let mut key_node = XmlNode::new("Key");
            out.write_value(key_kind, key, &mut key_node)?;
            let mut value_node = XmlNode::new("Value");
            out.write_value(value_kind, item, &mut value_node)?;

            let mut entry = XmlNode::new("Entry");
            entry.children.push(key_node);
            entry.children.push(value_node);
            node.children.push(entry);
        }
        Ok(())
    }

    fn read_xml(&self, input: &mut XmlReader<'_>, kind: &DataKind, node: &XmlNode) -> Result<Value> {
        let (key_kind, value_kind) = entry_kinds(kind)?;
        let mut entries = Vec::new();
        for entry in node.children_named("Entry") {
            let key_node = entry
                .child("Key")
                .ok_or_else(|| ReflectError::xml("map entry without <Key>"))?;
            let value_node = entry
                .child("Value")
                .ok_or_else(|| ReflectError::xml("map entry without <Value>"))?;
            entries.push((input.read_value(key_kind, key_node)?, input.read_value(value_kind, value_node)?));
        }
        Ok(Value::Map(entries))
    }
}
