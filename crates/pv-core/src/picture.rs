//! Picture domain model and deployment-mode enums.
//!
//! All enums serialize in lowercase (via `serde(rename_all = "lowercase")`) and
//! implement `Display` manually for consistent string representation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::ids::{PictureId, SessionId};

// ---------------------------------------------------------------------------
// Picture
// ---------------------------------------------------------------------------

/// A stored picture as recorded in the metadata index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Picture {
    pub id: PictureId,
    /// Client-supplied name. A display and content-type hint only.
    pub filename: String,
    /// Opaque reference into the blob store.
    pub blob_key: String,
    pub session_id: Option<SessionId>,
    pub created_at: String,
}

impl Picture {
    pub fn summary(&self) -> PictureSummary {
        PictureSummary {
            id: self.id,
            filename: self.filename.clone(),
        }
    }

    /// Content type to serve this picture with.
    pub fn content_type(&self) -> &'static str {
        content_type_for(&self.filename)
    }
}

/// Listing entry: identity and name without the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictureSummary {
    pub id: PictureId,
    pub filename: String,
}

/// A row to be inserted; the index assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPicture {
    pub filename: String,
    pub blob_key: String,
    pub session_id: Option<SessionId>,
}

/// Guess a content type from a filename extension.
///
/// Unknown or missing extensions fall back to `image/jpeg`.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        "heic" => "image/heic",
        _ => "image/jpeg",
    }
}

// ---------------------------------------------------------------------------
// StoreMode
// ---------------------------------------------------------------------------

/// How pictures are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// At most one picture; each upload replaces it.
    Singleton,
    /// Monotonically increasing ids.
    #[default]
    Sequential,
    /// Per-session galleries.
    Session,
}

impl StoreMode {
    /// Whether Put and List require a session.
    pub fn requires_session(self) -> bool {
        matches!(self, Self::Session)
    }
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => write!(f, "singleton"),
            Self::Sequential => write!(f, "sequential"),
            Self::Session => write!(f, "session"),
        }
    }
}

impl FromStr for StoreMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "singleton" => Ok(Self::Singleton),
            "sequential" => Ok(Self::Sequential),
            "session" => Ok(Self::Session),
            other => Err(Error::invalid(format!("unknown store mode: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// BlobBackend
// ---------------------------------------------------------------------------

/// Where picture bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    /// Files in a flat directory, referenced by the metadata row.
    #[default]
    Filesystem,
    /// Bytes embedded in the metadata row itself.
    Inline,
}

impl fmt::Display for BlobBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filesystem => write!(f, "filesystem"),
            Self::Inline => write!(f, "inline"),
        }
    }
}

impl FromStr for BlobBackend {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "filesystem" | "fs" => Ok(Self::Filesystem),
            "inline" => Ok(Self::Inline),
            other => Err(Error::invalid(format!("unknown blob backend: {other}"))),
        }
    }
}
