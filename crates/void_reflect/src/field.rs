//! Reflected fields
//!
//! A [`Field`] is one named, typed, flagged member of a class. It owns a
//! type-erased accessor pair so archives and tools can read and write the
//! member without knowing the concrete struct.

use crate::data::Data;
use crate::error::{ReflectError, Result};
use crate::object::Object;
use crate::registry::Registry;
use crate::value::{DataKind, Value};
use core::any::Any;
use core::fmt;
use std::sync::Arc;

bitflags::bitflags! {
    /// Per-field behavior flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u32 {
        /// Not shown by property editors
        const HIDDEN = 1 << 0;
        /// Shown but not editable
        const READ_ONLY = 1 << 1;
        /// String holds a file system path
        const PATH = 1 << 2;
        /// Never persisted
        const DISCARD = 1 << 3;
        /// Persisted even when equal to the default
        const FORCE = 1 << 4;
        /// Field does not declare a default value
        const NO_DEFAULT = 1 << 5;
    }
}

pub(crate) type Getter = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
pub(crate) type Setter = Arc<dyn Fn(&mut dyn Any, Value) -> Result<()> + Send + Sync>;
pub(crate) type ElementWalker = Arc<dyn Fn(&dyn Any, &mut dyn FnMut(&dyn Object)) + Send + Sync>;

/// Persisted tag of a field, the CRC-32 of its name
pub fn field_id(name: &str) -> u32 {
    crc32fast::hash(name.as_bytes())
}

/// Derive the display name from a storage name (`m_Count` → `Count`)
pub fn ui_name_of(name: &str) -> &str {
    match name.strip_prefix("m_") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => name,
    }
}

/// One member of a reflected class
#[derive(Clone)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) ui_name: String,
    pub(crate) description: String,
    pub(crate) index: usize,
    pub(crate) id: u32,
    pub(crate) kind: DataKind,
    pub(crate) flags: FieldFlags,
    pub(crate) default: Option<Value>,
    pub(crate) get: Getter,
    pub(crate) set: Setter,
    pub(crate) elements: ElementWalker,
}

impl Field {
    pub(crate) fn new(name: &str, kind: DataKind, get: Getter, set: Setter, elements: ElementWalker) -> Self {
        let mut flags = FieldFlags::empty();
        if kind == DataKind::Path {
            flags |= FieldFlags::PATH;
        }
        Self {
            name: name.to_string(),
            ui_name: ui_name_of(name).to_string(),
            description: String::new(),
            index: 0,
            id: field_id(name),
            kind,
            flags,
            default: None,
            get,
            set,
            elements,
        }
    }

    /// Rebind this field onto a struct `D` that embeds the owner `B`
    pub(crate) fn project<D: Any, B: Any>(
        &self,
        project: fn(&D) -> &B,
        project_mut: fn(&mut D) -> &mut B,
    ) -> Field {
        let get = self.get.clone();
        let set = self.set.clone();
        let elements = self.elements.clone();
        let name = self.name.clone();
        Field {
            get: Arc::new(move |any: &dyn Any| {
                any.downcast_ref::<D>().and_then(|outer| get(project(outer) as &dyn Any))
            }),
            set: Arc::new(move |any: &mut dyn Any, value: Value| match any.downcast_mut::<D>() {
                Some(outer) => set(project_mut(outer) as &mut dyn Any, value),
                None => Err(ReflectError::FieldAccess {
                    field: name.clone(),
                    class: core::any::type_name::<D>().to_string(),
                }),
            }),
            elements: Arc::new(move |any: &dyn Any, f: &mut dyn FnMut(&dyn Object)| {
                if let Some(outer) = any.downcast_ref::<D>() {
                    elements(project(outer) as &dyn Any, f);
                }
            }),
            ..self.clone()
        }
    }

    /// Storage name, as persisted
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ui_name(&self) -> &str {
        &self.ui_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Position in the class's full field list
    pub fn index(&self) -> usize {
        self.index
    }

    /// Persisted tag, see [`field_id`]
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> &DataKind {
        &self.kind
    }

    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    pub fn has_flag(&self, flag: FieldFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Default captured at registration, `None` for `NO_DEFAULT` fields
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Read the field from an instance
    pub fn get(&self, object: &dyn Object) -> Result<Value> {
        (self.get)(object.as_any()).ok_or_else(|| ReflectError::FieldAccess {
            field: self.name.clone(),
            class: object.class_name().to_string(),
        })
    }

    /// Write the field on an instance
    pub fn set(&self, object: &mut dyn Object, value: Value) -> Result<()> {
        (self.set)(object.as_any_mut(), value)
    }

    /// Visit the nested objects held in this field, in place
    pub fn for_each_element(&self, object: &dyn Object, f: &mut dyn FnMut(&dyn Object)) {
        (self.elements)(object.as_any(), f);
    }

    /// Bind the serializer for this field's kind to an instance
    pub fn create_serializer<'a>(
        &'a self,
        registry: &Registry,
        object: &'a dyn Object,
    ) -> Result<ConnectedData<'a>> {
        let data = registry.serializer_for(&self.kind)?;
        Ok(ConnectedData::connect(data, self, Binding::Shared(object)))
    }

    /// Bind the serializer for this field's kind to a mutable instance
    pub fn create_serializer_mut<'a>(
        &'a self,
        registry: &Registry,
        object: &'a mut dyn Object,
    ) -> Result<ConnectedData<'a>> {
        let data = registry.serializer_for(&self.kind)?;
        Ok(ConnectedData::connect(data, self, Binding::Exclusive(object)))
    }

    /// Check whether the live value equals the declared default
    pub fn has_default_value(&self, registry: &Registry, object: &dyn Object) -> Result<bool> {
        self.create_serializer(registry, object)?.is_default()
    }

    /// Reset the live value to the declared default
    pub fn set_default_value(&self, registry: &Registry, object: &mut dyn Object) -> Result<()> {
        self.create_serializer_mut(registry, object)?.set_default()
    }

    /// Metadata equality, accessors excluded
    pub(crate) fn same_definition(&self, other: &Field) -> bool {
        self.name == other.name
            && self.ui_name == other.ui_name
            && self.index == other.index
            && self.kind == other.kind
            && self.flags == other.flags
            && self.default == other.default
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .field("default", &self.default)
            .finish()
    }
}

enum Binding<'a> {
    Shared(&'a dyn Object),
    Exclusive(&'a mut dyn Object),
}

impl Binding<'_> {
    fn object(&self) -> &dyn Object {
        match self {
            Binding::Shared(object) => *object,
            Binding::Exclusive(object) => &**object,
        }
    }
}

/// A serializer bound to one (field, instance) pair
///
/// The binding lasts as long as the guard; dropping it disconnects.
pub struct ConnectedData<'a> {
    data: Arc<dyn Data>,
    field: &'a Field,
    instance: Binding<'a>,
}

impl<'a> ConnectedData<'a> {
    fn connect(data: Arc<dyn Data>, field: &'a Field, instance: Binding<'a>) -> Self {
        log::trace!(
            "Connect {} serializer to {}::{}",
            data.tag().name(),
            instance.object().class_name(),
            field.name
        );
        Self { data, field, instance }
    }

    pub fn data(&self) -> &dyn Data {
        &*self.data
    }

    pub fn field(&self) -> &Field {
        self.field
    }

    /// Current value of the bound field
    pub fn value(&self) -> Result<Value> {
        self.field.get(self.instance.object())
    }

    /// Compare the bound field against a value using the serializer's equality
    pub fn equals(&self, other: &Value) -> Result<bool> {
        Ok(self.data.equals(&self.value()?, other))
    }

    pub fn is_default(&self) -> Result<bool> {
        match &self.field.default {
            Some(default) => self.equals(default),
            None => Err(ReflectError::MissingDefault(self.field.name.clone())),
        }
    }

    /// Assign the bound field, requires a mutable binding
    pub fn set(&mut self, value: Value) -> Result<()> {
        match &mut self.instance {
            Binding::Exclusive(object) => self.field.set(&mut **object, value),
            Binding::Shared(object) => Err(ReflectError::FieldAccess {
                field: self.field.name.clone(),
                class: object.class_name().to_string(),
            }),
        }
    }

    pub fn set_default(&mut self) -> Result<()> {
        match self.field.default.clone() {
            Some(default) => self.set(default),
            None => Err(ReflectError::MissingDefault(self.field.name.clone())),
        }
    }
}

impl Drop for ConnectedData<'_> {
    fn drop(&mut self) {
        log::trace!(
            "Disconnect {} serializer from {}::{}",
            self.data.tag().name(),
            self.instance.object().class_name(),
            self.field.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_name_strips_member_prefix() {
        assert_eq!(ui_name_of("m_Count"), "Count");
        assert_eq!(ui_name_of("count"), "count");
        assert_eq!(ui_name_of("m_"), "m_");
    }

    #[test]
    fn test_field_id_is_name_crc() {
        assert_eq!(field_id("m_Count"), crc32fast::hash(b"m_Count"));
        assert_ne!(field_id("m_Count"), field_id("m_Name"));
    }
}
