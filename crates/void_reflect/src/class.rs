//! Class metadata
//!
//! A [`Class`] is the registered description of a reflected struct: its
//! names, its base class, its ordered field list and the factory that
//! creates blank instances.

use crate::composite::Compositor;
use crate::error::{ReflectError, Result};
use crate::field::{Field, FieldFlags};
use crate::object::{Object, ObjectPtr, Reflect};
use crate::registry::Registry;
use crate::ty::{shorten_name, TypeId};
use crate::value::Value;
use core::fmt;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Creates a default-constructed instance
pub type Factory = Arc<dyn Fn() -> ObjectPtr + Send + Sync>;

/// Registered class metadata
pub struct Class {
    id: TypeId,
    name: String,
    short_name: String,
    ui_name: String,
    base: Option<String>,
    fields: Vec<Field>,
    inherited: usize,
    factory: Option<Factory>,
    derived: RwLock<BTreeSet<String>>,
    rust_type: core::any::TypeId,
}

impl Class {
    /// Build the class described by `T`, running its field enumeration
    pub fn of<T: Reflect>() -> Result<Self> {
        let comp = Compositor::<T>::enumerate();
        let mut fields = comp.fields;

        let prototype = T::default();
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(ReflectError::DuplicateField {
                    class: T::NAME.to_string(),
                    field: field.name.clone(),
                });
            }
        }

        for (index, field) in fields.iter_mut().enumerate() {
            field.index = index;
            if !field.flags.contains(FieldFlags::NO_DEFAULT) {
                field.default = Some(field.get(&prototype)?);
            }
        }

        let factory: Option<Factory> = if T::ABSTRACT {
            None
        } else {
            Some(Arc::new(|| Box::new(T::default()) as ObjectPtr))
        };

        let short_name = shorten_name(T::NAME).to_string();
        Ok(Self {
            id: TypeId::of_name(T::NAME),
            name: T::NAME.to_string(),
            ui_name: short_name.clone(),
            short_name,
            base: comp.base.map(str::to_string),
            fields,
            inherited: comp.inherited,
            factory,
            derived: RwLock::new(BTreeSet::new()),
            rust_type: core::any::TypeId::of::<T>(),
        })
    }

    /// Override the short name
    pub fn with_short_name(mut self, short_name: &str) -> Self {
        self.short_name = short_name.to_string();
        self.ui_name = short_name.to_string();
        self
    }

    /// Override the display name
    pub fn with_ui_name(mut self, ui_name: &str) -> Self {
        self.ui_name = ui_name.to_string();
        self
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

    pub fn ui_name(&self) -> &str {
        &self.ui_name
    }

    /// Canonical name of the base class, if any
    pub fn base_name(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// All fields in persisted order, inherited ones first
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Only the fields declared by this class
    pub fn declared_fields(&self) -> &[Field] {
        &self.fields[self.inherited..]
    }

    pub fn find_field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn find_field_by_index(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Find a field by its persisted tag
    pub fn find_field_by_id(&self, id: u32) -> Option<&Field> {
        self.fields.iter().find(|f| f.id() == id)
    }

    pub fn is_abstract(&self) -> bool {
        self.factory.is_none()
    }

    /// Rust type identity of the backing struct
    pub fn rust_type(&self) -> core::any::TypeId {
        self.rust_type
    }

    /// Create a blank instance, `None` for abstract classes
    pub(crate) fn create(&self) -> Option<ObjectPtr> {
        self.factory.as_ref().map(|factory| factory())
    }

    /// Names of the registered classes deriving directly from this one
    pub fn derived(&self) -> Vec<String> {
        self.derived.read().iter().cloned().collect()
    }

    pub(crate) fn link_derived(&self, name: &str) {
        self.derived.write().insert(name.to_string());
    }

    pub(crate) fn unlink_derived(&self, name: &str) {
        self.derived.write().remove(name);
    }

    /// Check if this class is `base` or derives from it
    pub fn has_type(&self, registry: &Registry, base: TypeId) -> bool {
        registry.is_a(self.id, base)
    }

    /// Field-wise equality of two instances of this class
    pub fn equals(&self, a: &dyn Object, b: &dyn Object) -> bool {
        self.fields.iter().all(|field| match (field.get(a), field.get(b)) {
            (Ok(x), Ok(y)) => x == y,
            _ => false,
        })
    }

    /// Copy the fields `src` and `dst` have in common
    ///
    /// The copy goes through the deepest class both instances derive from.
    pub fn copy(registry: &Registry, src: &dyn Object, dst: &mut dyn Object) -> Result<()> {
        let common = registry
            .common_base(src.reflect_type(), dst.reflect_type())
            .ok_or_else(|| ReflectError::mismatch(src.class_name(), dst.class_name()))?;

        // base field lists are prefixes of derived ones, so indices line up
        let src_class = registry
            .get_class(src.reflect_type())
            .ok_or_else(|| ReflectError::UnknownType(src.class_name().to_string()))?;
        let dst_class = registry
            .get_class(dst.reflect_type())
            .ok_or_else(|| ReflectError::UnknownType(dst.class_name().to_string()))?;

        for index in 0..common.fields.len() {
            if let (Some(from), Some(to)) = (src_class.fields.get(index), dst_class.fields.get(index)) {
                to.set(dst, from.get(src)?)?;
            }
        }
        Ok(())
    }

    /// Walk the fields of `object` and of every element nested in them
    pub fn visit(&self, registry: &Registry, object: &dyn Object, visitor: &mut dyn Visitor) -> Result<()> {
        if !visitor.visit_object(object, self) {
            return Ok(());
        }
        for field in &self.fields {
            let value = field.get(object)?;
            if visitor.visit_field(object, field, &value) {
                visit_value(registry, &value, visitor)?;
            }
        }
        Ok(())
    }

    /// Metadata equality, accessors and factories excluded
    pub(crate) fn same_definition(&self, other: &Class) -> bool {
        self.name == other.name
            && self.short_name == other.short_name
            && self.base == other.base
            && self.rust_type == other.rust_type
            && self.is_abstract() == other.is_abstract()
            && self.fields.len() == other.fields.len()
            && self.fields.iter().zip(&other.fields).all(|(a, b)| a.same_definition(b))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("base", &self.base)
            .field("fields", &self.fields)
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

fn visit_value(registry: &Registry, value: &Value, visitor: &mut dyn Visitor) -> Result<()> {
    match value {
        Value::Element(Some(element)) => {
            let class = registry
                .get_class(element.reflect_type())
                .ok_or_else(|| ReflectError::UnknownType(element.class_name().to_string()))?;
            class.visit(registry, &**element, visitor)
        }
        Value::Array(items) | Value::Set(items) => {
            items.iter().try_for_each(|item| visit_value(registry, item, visitor))
        }
        Value::Map(entries) => entries
            .iter()
            .try_for_each(|(_, item)| visit_value(registry, item, visitor)),
        _ => Ok(()),
    }
}

/// Callbacks for [`Class::visit`]
pub trait Visitor {
    /// Called before the fields of an object, return false to skip them
    fn visit_object(&mut self, _object: &dyn Object, _class: &Class) -> bool {
        true
    }

    /// Called per field, return false to skip elements nested in it
    fn visit_field(&mut self, object: &dyn Object, field: &Field, value: &Value) -> bool;
}
