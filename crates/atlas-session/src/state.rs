//! Session State Machine
//!
//! ```text
//! Valid
//!   ↓ expiry instant passes OR expired signal received
//! Expired
//!   ↓ explicit dismiss only
//! Valid
//! ```
//!
//! A fresh expiry instant alone never transitions `Expired -> Valid`; a new
//! session goes through an explicit dismiss or a fresh monitor, so the
//! prompt cannot flap.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// The authentication grant is believed valid
    Valid,
    /// The re-authentication prompt should be shown
    Expired,
}

impl SessionState {
    pub fn is_expired(&self) -> bool {
        matches!(self, SessionState::Expired)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Valid => "valid",
            SessionState::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(SessionState::Valid.to_string(), "valid");
        assert_eq!(SessionState::Expired.to_string(), "expired");
        assert!(SessionState::Expired.is_expired());
        assert!(!SessionState::Valid.is_expired());
    }
}
