//! Typed identifiers for pictures and sessions.
//!
//! [`PictureId`] wraps the integer identity assigned by the metadata index;
//! [`SessionId`] wraps the opaque token that partitions galleries.
//! [`PictureRef`] is what callers use to address a picture: either a concrete
//! id or the `latest` one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

// ---------------------------------------------------------------------------
// PictureId
// ---------------------------------------------------------------------------

/// Identity of a stored picture, assigned by the metadata index on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PictureId(i64);

impl PictureId {
    /// Return the raw integer value.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for PictureId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<PictureId> for i64 {
    fn from(id: PictureId) -> Self {
        id.0
    }
}

impl fmt::Display for PictureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PictureId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let n: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::invalid(format!("invalid picture id: {s:?}")))?;
        if n <= 0 {
            return Err(Error::invalid(format!("invalid picture id: {s:?}")));
        }
        Ok(Self(n))
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Longest session token accepted from a caller.
pub const MAX_SESSION_LEN: usize = 128;

/// Opaque token partitioning pictures into per-caller galleries.
///
/// Tokens are restricted to ASCII alphanumerics, `-` and `_` so they can be
/// carried in headers and stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random session token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Borrow the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::invalid("session id is empty"));
        }
        if s.len() > MAX_SESSION_LEN {
            return Err(Error::invalid(format!(
                "session id exceeds {MAX_SESSION_LEN} characters"
            )));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::invalid("session id contains invalid characters"));
        }
        Ok(Self(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// PictureRef
// ---------------------------------------------------------------------------

/// How a caller addresses a picture for Get and Delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureRef {
    /// The most recently committed picture.
    Latest,
    /// A specific picture.
    Id(PictureId),
}

impl fmt::Display for PictureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for PictureRef {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("latest") {
            Ok(Self::Latest)
        } else {
            s.parse().map(Self::Id)
        }
    }
}

impl From<PictureId> for PictureRef {
    fn from(id: PictureId) -> Self {
        Self::Id(id)
    }
}
