//! # void_reflect - Runtime Reflection and Archives
//!
//! Runtime type information for engine content:
//! - A thread-safe [`Registry`] of classes and enumerations, keyed by a
//!   stable [`TypeId`] derived from the canonical type name
//! - Declarative field enumeration through [`Compositor`], with single
//!   inheritance by embedding
//! - Generic field access (copy, compare, default detection) via [`Field`]
//!   and [`ConnectedData`]
//! - Versioned binary and XML archives with per-element failure isolation
//!
//! ## Example
//!
//! ```ignore
//! use void_reflect::prelude::*;
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct Light {
//!     intensity: f32,
//!     tags: Vec<String>,
//! }
//!
//! impl Reflect for Light {
//!     const NAME: &'static str = "Light";
//!
//!     fn enumerate(comp: &mut Compositor<Self>) {
//!         comp.field("m_Intensity", |s| &s.intensity, |s| &mut s.intensity);
//!         comp.field("m_Tags", |s| &s.tags, |s| &mut s.tags);
//!     }
//! }
//!
//! let registry = Registry::default();
//! registry.register_class::<Light>()?;
//!
//! let light = Light { intensity: 2.0, ..Default::default() };
//! let bytes = archive::to_bytes(&registry, &[&light], &Version::current())?;
//! let contents = archive::from_bytes(&registry, &bytes)?;
//! assert_eq!(contents.first::<Light>(), Some(&light));
//! ```

pub mod archive;
pub mod class;
pub mod composite;
pub mod data;
pub mod enumeration;
pub mod error;
pub mod field;
pub mod lifecycle;
pub mod object;
pub mod registry;
pub mod tracker;
pub mod ty;
pub mod value;
pub mod version;

pub use archive::{ArchiveContents, ArchiveState, ArchiveType, ElementFailure, StatusInfo, StatusSink};
pub use class::{Class, Visitor};
pub use composite::{Compositor, FieldBuilder};
pub use data::Data;
pub use enumeration::{Enumeration, EnumerationElement, ReflectEnum};
pub use error::{ReflectError, Result};
pub use field::{ConnectedData, Field, FieldFlags};
pub use lifecycle::{cleanup, initialize, initialize_with, is_initialized, registry, InitializerStack, Unregister};
pub use object::{downcast_object, type_id_of, Object, ObjectPtr, Reflect};
pub use registry::{Registry, RegistryConfig};
pub use tracker::Tracker;
pub use ty::{ReflectionKind, Type, TypeId};
pub use value::{DataKind, DataTag, FieldValue, Value};
pub use version::Version;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::archive::{self, ArchiveContents, StatusInfo, StatusSink};
    pub use crate::class::Class;
    pub use crate::composite::Compositor;
    pub use crate::enumeration::ReflectEnum;
    pub use crate::error::{ReflectError, Result};
    pub use crate::field::FieldFlags;
    pub use crate::impl_enumeration;
    pub use crate::object::{Object, ObjectPtr, Reflect};
    pub use crate::registry::{Registry, RegistryConfig};
    pub use crate::ty::TypeId;
    pub use crate::value::{FieldValue, Value};
    pub use crate::version::Version;
    pub use void_core::Tuid;
}
