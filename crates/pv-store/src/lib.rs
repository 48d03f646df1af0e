//! pv-store: picture storage and management.
//!
//! This crate keeps picture bytes and picture metadata consistent. A
//! [`BlobStore`] holds raw bytes under opaque keys, a [`MetadataIndex`]
//! maps picture identities to those keys, and [`PictureStore`] orchestrates
//! the two so that no row ever points at a missing blob and no blob outlives
//! its row.

pub mod blob;
pub mod index;
mod service;
pub mod session;

pub use blob::{BlobError, BlobResult, BlobStore};
pub use index::{MetadataIndex, SqliteIndex};
pub use service::{PictureStore, PutRequest, StoredPicture, SweepReport};
pub use session::{RandomSessions, SessionScope};
