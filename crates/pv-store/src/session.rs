//! Session scoping for per-caller galleries.
//!
//! The store never invents session tokens; a [`SessionScope`] hands them out
//! and the caller threads them into Put and List.

use pv_core::{Result, SessionId};

/// Issues session tokens for callers that do not present one.
pub trait SessionScope: Send + Sync {
    /// Produce a fresh token.
    fn issue(&self) -> SessionId;

    /// Validate a presented token, or issue a new one when none was
    /// presented. The flag is `true` when the token was just issued.
    fn resolve(&self, presented: Option<&str>) -> Result<(SessionId, bool)> {
        match presented {
            Some(raw) => Ok((raw.parse()?, false)),
            None => Ok((self.issue(), true)),
        }
    }
}

/// Issues random UUID-derived tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSessions;

impl SessionScope for RandomSessions {
    fn issue(&self) -> SessionId {
        SessionId::generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_keeps_presented_token() {
        let (session, issued) = RandomSessions.resolve(Some("s1")).unwrap();
        assert_eq!(session.as_str(), "s1");
        assert!(!issued);
    }

    #[test]
    fn resolve_issues_when_absent() {
        let (a, issued) = RandomSessions.resolve(None).unwrap();
        assert!(issued);
        let (b, _) = RandomSessions.resolve(None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_rejects_malformed_token() {
        assert!(RandomSessions.resolve(Some("no spaces allowed")).is_err());
    }
}
