//! Field enumeration
//!
//! [`Compositor`] is the builder handed to [`Reflect::enumerate`]. Each call
//! to [`Compositor::field`] binds one member through an accessor pair, and
//! [`Compositor::inherit`] pulls in the fields of an embedded base class.
//! The resulting order (base fields, then own fields) is the persisted
//! field order.

use crate::error::{ReflectError, Result};
use crate::field::{Field, FieldFlags};
use crate::object::{Object, Reflect};
use crate::value::{FieldValue, Value};
use core::any::Any;
use core::marker::PhantomData;
use std::sync::Arc;

/// Builder collecting the fields of `T`
pub struct Compositor<T> {
    pub(crate) fields: Vec<Field>,
    pub(crate) base: Option<&'static str>,
    pub(crate) inherited: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Reflect> Compositor<T> {
    pub(crate) fn new() -> Self {
        Self {
            fields: Vec::new(),
            base: None,
            inherited: 0,
            _marker: PhantomData,
        }
    }

    /// Run `T::enumerate` against a fresh builder
    pub(crate) fn enumerate() -> Self {
        let mut comp = Self::new();
        T::enumerate(&mut comp);
        comp
    }

    /// Bind a member of `T` to a field named `name`
    pub fn field<V: FieldValue>(
        &mut self,
        name: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> FieldBuilder<'_> {
        let field_name = name.to_string();
        let getter = Arc::new(move |any: &dyn Any| any.downcast_ref::<T>().map(|obj| get(obj).to_value()));
        let setter = Arc::new(move |any: &mut dyn Any, value: Value| -> Result<()> {
            match any.downcast_mut::<T>() {
                Some(obj) => {
                    *get_mut(obj) = V::from_value(value)?;
                    Ok(())
                }
                None => Err(ReflectError::FieldAccess {
                    field: field_name.clone(),
                    class: T::NAME.to_string(),
                }),
            }
        });

        let elements = Arc::new(move |any: &dyn Any, f: &mut dyn FnMut(&dyn Object)| {
            if let Some(obj) = any.downcast_ref::<T>() {
                get(obj).for_each_element(f);
            }
        });

        self.fields.push(Field::new(name, V::kind(), getter, setter, elements));
        let index = self.fields.len() - 1;
        FieldBuilder {
            field: &mut self.fields[index],
        }
    }

    /// Include the fields of base class `B`, reached through a projection
    ///
    /// Base fields always precede the fields declared by `T`, whether this
    /// is called before or after them.
    pub fn inherit<B: Reflect>(&mut self, project: fn(&T) -> &B, project_mut: fn(&mut T) -> &mut B) {
        debug_assert!(
            self.base.is_none(),
            "{} inherits more than one base class",
            T::NAME
        );

        let base = Compositor::<B>::enumerate();
        let projected: Vec<Field> = base
            .fields
            .iter()
            .map(|field| field.project::<T, B>(project, project_mut))
            .collect();

        self.inherited = projected.len();
        self.fields.splice(0..0, projected);
        self.base = Some(B::NAME);
    }

    /// Number of fields declared so far, inherited ones included
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Optional metadata for a field being declared
pub struct FieldBuilder<'a> {
    field: &'a mut Field,
}

impl FieldBuilder<'_> {
    /// Add flags
    pub fn flags(self, flags: FieldFlags) -> Self {
        self.field.flags |= flags;
        self
    }

    /// Override the display name
    pub fn ui_name(self, ui_name: &str) -> Self {
        self.field.ui_name = ui_name.to_string();
        self
    }

    pub fn description(self, description: &str) -> Self {
        self.field.description = description.to_string();
        self
    }
}
