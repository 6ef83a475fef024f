//! # void_component - Component Collections
//!
//! Heterogeneous, validated sets of reflected sub-objects attached to a
//! host (asset, scene node):
//! - One component per slot, the slot being a class id
//! - Host policies and sibling rules checked before insertion
//! - Change events carrying the owning collection's id
//! - Persistence through `void_reflect` archives
//!
//! ## Example
//!
//! ```ignore
//! use void_component::prelude::*;
//!
//! let registry = Registry::default();
//! let mut types = ComponentTypes::new();
//! types.register::<Transform>(&registry)?;
//!
//! let mut collection = ComponentCollection::new();
//! collection.set_component(Box::new(Transform::default()), true)?;
//! assert!(collection.get::<Transform>().is_some());
//! ```

pub mod collection;
pub mod component;
pub mod error;
pub mod types;

pub use collection::{CollectionEvent, CollectionPolicy, ComponentCollection, DefaultPolicy, Listener, ListenerId};
pub use component::{slot_of, Component, ComponentBehavior, ComponentPtr, ComponentType};
pub use error::{ComponentError, Result};
pub use types::ComponentTypes;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::collection::{CollectionEvent, ComponentCollection};
    pub use crate::component::{Component, ComponentBehavior, ComponentPtr, ComponentType};
    pub use crate::error::ComponentError;
    pub use crate::types::ComponentTypes;
    pub use void_reflect::prelude::*;
}
