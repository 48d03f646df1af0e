//! pv-core: shared types, IDs, errors, and configuration.
//!
//! This crate is the foundational dependency for all other pv-* crates,
//! providing typed identifiers, the picture domain model, a unified error
//! type, and application configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod picture;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use picture::*;
