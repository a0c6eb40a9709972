//! ATLAS Core
//!
//! Central coordination layer for the ATLAS admin console's client state:
//! draft recovery for in-progress form edits and session expiry
//! monitoring, composed over one database and one signal bus.

mod config;
mod console;
mod error;

pub use config::Config;
pub use console::Console;
pub use error::CoreError;

// Re-export core components
pub use atlas_drafts::{DraftPhase, DraftStore, Debouncer, LoadOutcome};
pub use atlas_events::{SignalBus, Subscription};
pub use atlas_session::{SessionMonitor, SessionState};
pub use atlas_storage::{Database, DraftRecord, DraftStorage, MemoryDraftStore, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
