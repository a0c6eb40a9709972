//! Draft reconciliation state machine
//!
//! ```text
//! Loading
//!   ↓ record found          ↓ no record / read failure
//! DraftActive               NoDraft
//!   ↓ discard                 ↓ first debounced save
//! NoDraft                   DraftActive
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftPhase {
    /// The stored draft for this key has not been read yet
    Loading,
    /// A draft exists and owns the form state; server data is ignored
    DraftActive,
    /// No draft; the form is eligible for seeding from server data
    NoDraft,
}

impl DraftPhase {
    /// Check if transition to another phase is valid
    pub fn can_transition_to(&self, target: DraftPhase) -> bool {
        match (self, target) {
            // Load decision resolves one way or the other
            (DraftPhase::Loading, DraftPhase::DraftActive) => true,
            (DraftPhase::Loading, DraftPhase::NoDraft) => true,
            // First debounced save creates a draft
            (DraftPhase::NoDraft, DraftPhase::DraftActive) => true,
            // Discard removes it
            (DraftPhase::DraftActive, DraftPhase::NoDraft) => true,
            // Same phase is always valid (no-op)
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    /// Returns true while server data may seed the form
    pub fn accepts_server_data(&self) -> bool {
        matches!(self, DraftPhase::NoDraft)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DraftPhase::Loading => "loading",
            DraftPhase::DraftActive => "draft_active",
            DraftPhase::NoDraft => "no_draft",
        }
    }
}

impl std::fmt::Display for DraftPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
