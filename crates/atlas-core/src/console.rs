//! Console state hub
//!
//! Owns the draft database and the expired-session signal bus, both
//! constructed once at application start. Forms get a `DraftStore` per
//! mounted instance; providers get a `SessionMonitor` wired to the shared
//! bus; API call sites report credential failures through
//! `notify_session_expired`.

use std::sync::Arc;

use atlas_drafts::DraftStore;
use atlas_events::SignalBus;
use atlas_session::SessionMonitor;
use atlas_storage::{Database, DraftRecord, DraftStorage};

use crate::config::Config;
use crate::Result;

pub struct Console {
    config: Config,
    db: Database,
    bus: SignalBus,
}

impl Console {
    pub fn open(config: Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| crate::CoreError::Config(format!("data dir unavailable: {e}")))?;
        }

        let db = Database::open(&config.database_path)?;

        tracing::info!(
            database_path = %config.database_path.display(),
            "Opened console state"
        );

        Ok(Self {
            config,
            db,
            bus: SignalBus::new(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            config: Config::default(),
            db: Database::open_in_memory()?,
            bus: SignalBus::new(),
        })
    }

    /// Build the draft store for a mounted form instance. `key` composes
    /// entity type, mode, and id (e.g. `blog:edit:42`); `apply` is the
    /// form's reset/set operation.
    pub fn draft_store<F>(&self, key: impl Into<String>, apply: F) -> DraftStore
    where
        F: Fn(serde_json::Value) + Send + Sync + 'static,
    {
        DraftStore::with_debounce(
            key,
            Arc::new(self.db.clone()),
            apply,
            self.config.draft_debounce(),
        )
    }

    /// Build a session monitor wired to the console's signal bus.
    pub fn session_monitor(&self) -> SessionMonitor {
        SessionMonitor::with_poll_interval(&self.bus, self.config.session_poll_interval())
    }

    /// Report a 401/403 response. Called exactly once per such response by
    /// the API layer.
    pub fn notify_session_expired(&self) {
        self.bus.publish();
    }

    /// All persisted drafts, most recent first (the "unsaved work" view).
    pub fn list_drafts(&self) -> Result<Vec<DraftRecord>> {
        Ok(self.db.list()?)
    }

    /// Explicit bulk discard of every draft.
    pub fn clear_drafts(&self) -> Result<()> {
        Ok(self.db.clear_all()?)
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
