//! # void_core - Void Engine Core
//!
//! Zero-dependency identifiers shared by the reflection and component
//! crates. Object graphs owned through fields are trees; every other link
//! between objects (scene parent/child, asset references) is a weak
//! [`Tuid`] rather than a pointer.

pub mod id;

pub use id::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::id::{Tuid, TuidGenerator};
}
