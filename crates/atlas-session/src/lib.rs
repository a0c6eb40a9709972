//! ATLAS Session Monitoring
//!
//! Surfaces a "please re-authenticate" prompt when the session's expiry
//! instant passes, or when any API call site learns first (via a 401/403)
//! that the credential is already invalid. Call sites publish on the
//! shared signal bus; they never talk to the UI.

mod monitor;
mod state;

pub use monitor::{SessionMonitor, DEFAULT_POLL_INTERVAL};
pub use state::SessionState;
