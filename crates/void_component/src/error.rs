//! Error types for component collections

use thiserror::Error;
use void_reflect::{ReflectError, TypeId};

/// Why a component could not be added or converted
#[derive(Debug, Error)]
pub enum ComponentError {
    /// The slot is already occupied
    #[error("Component '{component}' is a duplicate, slot {slot} already holds '{existing}'")]
    Duplicate {
        component: String,
        slot: TypeId,
        existing: String,
    },

    /// The collection does not accept this kind of component
    #[error("Component '{component}' is not accepted by this collection: {reason}")]
    Incompatible { component: String, reason: String },

    /// A sibling rejected the component, or the component rejected a sibling
    #[error("Component '{component}' conflicts with '{sibling}': {reason}")]
    SiblingConflict {
        component: String,
        sibling: String,
        reason: String,
    },

    /// Object is not of a registered component type
    #[error("'{0}' is not a registered component type")]
    NotAComponent(String),

    /// Reflection failure while registering or copying
    #[error(transparent)]
    Reflect(#[from] ReflectError),
}

/// Result type for component operations
pub type Result<T> = std::result::Result<T, ComponentError>;
