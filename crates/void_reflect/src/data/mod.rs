//! Serializer strategies
//!
//! One [`Data`] implementation exists per [`DataTag`]. Each knows how to move
//! a [`Value`] of its kind through the binary stream and the XML tree, and
//! how to compare two values. Container and element serializers recurse
//! back into the archive contexts for their items.

mod container;
mod element;
mod scalar;

pub use container::{ArrayData, MapData, SetData};
pub use element::ElementData;
pub use scalar::{
    BoolData, EnumerationData, F32Data, F64Data, I16Data, I32Data, I64Data, I8Data, PathData, StringData,
    TuidData, U16Data, U32Data, U64Data, U8Data,
};

use crate::archive::binary::{BinaryReader, BinaryWriter};
use crate::archive::xml::{XmlNode, XmlReader, XmlWriter};
use crate::error::Result;
use crate::registry::Registry;
use crate::value::{DataKind, DataTag, Value};
use std::sync::Arc;

/// Serializer for one data kind
pub trait Data: Send + Sync {
    /// Tag this serializer is registered under
    fn tag(&self) -> DataTag;

    /// Value equality as used by default diffing
    fn equals(&self, a: &Value, b: &Value) -> bool {
        a == b
    }

    fn write_binary(&self, out: &mut BinaryWriter<'_>, kind: &DataKind, value: &Value) -> Result<()>;

    fn read_binary(&self, input: &mut BinaryReader<'_, '_>, kind: &DataKind) -> Result<Value>;

    /// Fill `node` with the value
    fn write_xml(&self, out: &mut XmlWriter<'_>, kind: &DataKind, value: &Value, node: &mut XmlNode) -> Result<()>;

    /// Read the value held by `node`
    fn read_xml(&self, input: &mut XmlReader<'_>, kind: &DataKind, node: &XmlNode) -> Result<Value>;
}

/// Install every built-in serializer
pub(crate) fn register_builtin(registry: &Registry) {
    let builtin: [Arc<dyn Data>; 19] = [
        Arc::new(BoolData),
        Arc::new(U8Data),
        Arc::new(I8Data),
        Arc::new(U16Data),
        Arc::new(I16Data),
        Arc::new(U32Data),
        Arc::new(I32Data),
        Arc::new(U64Data),
        Arc::new(I64Data),
        Arc::new(F32Data),
        Arc::new(F64Data),
        Arc::new(StringData),
        Arc::new(PathData),
        Arc::new(TuidData),
        Arc::new(EnumerationData),
        Arc::new(ElementData),
        Arc::new(ArrayData),
        Arc::new(SetData),
        Arc::new(MapData),
    ];
    for data in builtin {
        registry.register_serializer(data);
    }
}
