//! Error types for the reflection system

use crate::ty::TypeId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for reflection operations
pub type Result<T> = std::result::Result<T, ReflectError>;

/// Errors that can occur while registering types or moving objects through archives
#[derive(Debug, Error)]
pub enum ReflectError {
    /// A different type is already registered under this name
    #[error("Type '{name}' is already registered with different metadata")]
    ConflictingRegistration { name: String },

    /// Two different names hash to the same id
    #[error("Type id {id} of '{name}' collides with already registered '{existing}'")]
    IdCollision {
        id: TypeId,
        name: String,
        existing: String,
    },

    /// A name (or alias) is already bound to another type
    #[error("Name '{name}' is already bound to type '{existing}'")]
    NameTaken { name: String, existing: String },

    /// Type not found in the registry
    #[error("Type '{0}' not registered")]
    UnknownType(String),

    /// Type exists but is not a class
    #[error("Type '{0}' is not a class")]
    NotAClass(String),

    /// Class is abstract and cannot be instantiated
    #[error("Class '{0}' cannot be instantiated")]
    NotCreatable(String),

    /// An enumeration field refers to an enumeration that is not registered
    #[error("Field '{field}' uses enumeration '{enumeration}' which is not registered")]
    UnknownEnumeration { field: String, enumeration: String },

    /// Enumeration declares the same name twice
    #[error("Enumeration '{enumeration}' declares '{element}' more than once")]
    DuplicateEnumerationElement { enumeration: String, element: String },

    /// Two fields of one class share a name
    #[error("Class '{class}' declares field '{field}' more than once")]
    DuplicateField { class: String, field: String },

    /// A value did not have the shape the field expects
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Field accessor was applied to an object of the wrong class
    #[error("Field '{field}' cannot be accessed on an instance of '{class}'")]
    FieldAccess { field: String, class: String },

    /// A default value was required but the field has none
    #[error("Field '{0}' has no default value")]
    MissingDefault(String),

    /// No serializer registered for a data kind
    #[error("No serializer registered for data kind '{0}'")]
    MissingSerializer(String),

    /// Nested elements exceed the configured depth
    #[error("Element nesting exceeds the maximum depth of {0}")]
    DepthExceeded(usize),

    /// Structurally malformed archive data
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// Archive checksum does not match its contents
    #[error("Corruption detected, crc is {found:#010x}, should be {expected:#010x}")]
    Checksum { expected: u32, found: u32 },

    /// Archive was written by a newer format version
    #[error("Input stream version is higher than what is supported (input: {found}, current: {current})")]
    UnsupportedVersion { found: u32, current: u32 },

    /// Archive contains no elements where one was required
    #[error("Archive '{0}' does not contain an element of the requested type")]
    MissingElement(String),

    /// Binary payload encoding error
    #[error("Binary encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// XML parse or write error
    #[error("XML error: {0}")]
    Xml(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO error with the file it happened on
    #[error("Failed to access '{path}': {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReflectError {
    /// Create a type mismatch error
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        ReflectError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a data format error
    pub fn format(message: impl Into<String>) -> Self {
        ReflectError::DataFormat(message.into())
    }

    /// Create an XML error from any displayable parser/writer error
    pub fn xml(error: impl std::fmt::Display) -> Self {
        ReflectError::Xml(error.to_string())
    }

    /// Errors after which the surrounding stream can no longer be trusted
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ReflectError::DataFormat(_)
                | ReflectError::Checksum { .. }
                | ReflectError::UnsupportedVersion { .. }
                | ReflectError::Io(_)
                | ReflectError::File { .. }
        )
    }
}
