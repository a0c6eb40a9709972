//! Per-form draft store
//!
//! Reconciles three sources of form state: a persisted draft, the payload
//! fetched from the server, and live edits. The load/seed decision always
//! resolves before the write path is armed, so a stale initial form state
//! can never clobber a freshly loaded draft.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use atlas_storage::{DraftRecord, DraftStorage};

use crate::debounce::Debouncer;
use crate::phase::DraftPhase;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Form-framework hook that overwrites the live form state.
type ApplyFn = Arc<dyn Fn(Value) + Send + Sync>;

/// Result of the one-time load-on-mount reconciliation.
#[derive(Debug, Clone, Copy)]
pub struct LoadOutcome {
    /// True when a persisted draft overwrote the live form state
    pub restored_from_draft: bool,
}

struct Inner {
    phase: DraftPhase,
    loading: bool,
    /// Most recent server payload seen, kept so a discard can re-seed
    /// even when the payload arrived while a draft was active
    latest_server: Option<Value>,
}

pub struct DraftStore {
    key: String,
    storage: Arc<dyn DraftStorage>,
    apply: ApplyFn,
    inner: Arc<RwLock<Inner>>,
    debouncer: Debouncer,
}

impl DraftStore {
    /// `key` must be stable across re-renders of the same logical form
    /// instance and must differ between create/edit modes and between
    /// distinct entities. `apply` is the form's reset/set operation.
    pub fn new<F>(key: impl Into<String>, storage: Arc<dyn DraftStorage>, apply: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        Self::with_debounce(key, storage, apply, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce<F>(
        key: impl Into<String>,
        storage: Arc<dyn DraftStorage>,
        apply: F,
        debounce: Duration,
    ) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            storage,
            apply: Arc::new(apply),
            inner: Arc::new(RwLock::new(Inner {
                phase: DraftPhase::Loading,
                loading: true,
                latest_server: None,
            })),
            debouncer: Debouncer::new(debounce),
        }
    }

    /// One-time load-or-seed decision, run once per mount.
    ///
    /// A stored draft wins over `server_data`; absent a draft the form is
    /// seeded from `server_data` when present, and stays eligible for a
    /// later [`server_data_ready`](Self::server_data_ready). A read failure
    /// degrades to the no-draft path and still completes loading.
    pub fn initialize(&self, server_data: Option<Value>) -> LoadOutcome {
        {
            let mut inner = self.inner.write();
            if !inner.loading {
                // Already resolved for this instance
                return LoadOutcome {
                    restored_from_draft: inner.phase == DraftPhase::DraftActive,
                };
            }
            if let Some(data) = server_data {
                inner.latest_server = Some(data);
            }
        }

        let record = match self.storage.get(&self.key) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    draft_key = %self.key,
                    error = %e,
                    "Draft read failed, treating as no draft"
                );
                None
            }
        };

        match record {
            Some(record) => {
                {
                    let mut inner = self.inner.write();
                    inner.phase = DraftPhase::DraftActive;
                    inner.loading = false;
                }

                tracing::info!(draft_key = %self.key, "Restored draft");
                (self.apply)(record.data);

                LoadOutcome {
                    restored_from_draft: true,
                }
            }
            None => {
                let seed = {
                    let mut inner = self.inner.write();
                    inner.phase = DraftPhase::NoDraft;
                    inner.loading = false;
                    inner.latest_server.clone()
                };

                if let Some(data) = seed {
                    (self.apply)(data);
                }

                LoadOutcome {
                    restored_from_draft: false,
                }
            }
        }
    }

    /// Report a (possibly late) server payload. Applied to the form only
    /// while no draft owns the state; always remembered for re-seeding
    /// after a discard.
    pub fn server_data_ready(&self, data: Value) {
        let seed = {
            let mut inner = self.inner.write();
            inner.latest_server = Some(data.clone());
            !inner.loading && inner.phase.accepts_server_data()
        };

        if seed {
            tracing::debug!(draft_key = %self.key, "Seeding form from server data");
            (self.apply)(data);
        }
    }

    /// Observe a live form snapshot and schedule a debounced persist.
    ///
    /// No-op while the load decision is unresolved; only the most recent
    /// snapshot within the quiet period is written. Persistence never
    /// blocks the caller; a failed write is logged and retried by the next
    /// debounced save.
    pub fn observe(&self, form_state: Value) {
        {
            let inner = self.inner.read();
            if inner.loading {
                tracing::trace!(draft_key = %self.key, "Ignoring form change while loading");
                return;
            }
        }

        let key = self.key.clone();
        let storage = Arc::clone(&self.storage);
        let inner = Arc::clone(&self.inner);

        self.debouncer.schedule(move || {
            let record = DraftRecord::new(key.clone(), form_state);
            match storage.put(&record) {
                Ok(()) => {
                    let mut inner = inner.write();
                    if inner.phase == DraftPhase::NoDraft {
                        inner.phase = DraftPhase::DraftActive;
                    }
                    tracing::debug!(draft_key = %key, "Saved draft");
                }
                Err(e) => {
                    tracing::warn!(draft_key = %key, error = %e, "Draft save failed");
                }
            }
        });
    }

    /// Delete the draft after a successful submit or an explicit discard.
    ///
    /// Idempotent; a delete failure is logged but never blocks the caller.
    /// Re-opens server-data seeding: if a server payload is known, the form
    /// is re-seeded from it immediately.
    pub fn discard(&self) {
        // A pending debounced save would just recreate the draft.
        self.debouncer.cancel();

        if let Err(e) = self.storage.delete(&self.key) {
            tracing::warn!(draft_key = %self.key, error = %e, "Draft delete failed");
        }

        let seed = {
            let mut inner = self.inner.write();
            inner.phase = DraftPhase::NoDraft;
            inner.loading = false;
            inner.latest_server.clone()
        };

        tracing::info!(draft_key = %self.key, "Discarded draft");

        if let Some(data) = seed {
            (self.apply)(data);
        }
    }

    /// True until the load-or-seed decision has resolved once.
    pub fn is_loading(&self) -> bool {
        self.inner.read().loading
    }

    pub fn phase(&self) -> DraftPhase {
        self.inner.read().phase
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_storage::{MemoryDraftStore, Result as StorageResult, StorageError};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stand-in for the live form: remembers the last applied payload.
    fn form_sink() -> (Arc<Mutex<Option<Value>>>, impl Fn(Value) + Send + Sync) {
        let form = Arc::new(Mutex::new(None));
        let sink = {
            let form = Arc::clone(&form);
            move |value: Value| {
                *form.lock() = Some(value);
            }
        };
        (form, sink)
    }

    struct CountingStore {
        store: MemoryDraftStore,
        puts: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                store: MemoryDraftStore::new(),
                puts: AtomicUsize::new(0),
            }
        }
    }

    impl DraftStorage for CountingStore {
        fn get(&self, key: &str) -> StorageResult<Option<DraftRecord>> {
            self.store.get(key)
        }

        fn put(&self, record: &DraftRecord) -> StorageResult<()> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.store.put(record)
        }

        fn delete(&self, key: &str) -> StorageResult<()> {
            self.store.delete(key)
        }

        fn list(&self) -> StorageResult<Vec<DraftRecord>> {
            self.store.list()
        }
    }

    /// Storage whose reads always fail.
    struct BrokenStore;

    impl DraftStorage for BrokenStore {
        fn get(&self, _key: &str) -> StorageResult<Option<DraftRecord>> {
            Err(StorageError::Migration("storage unavailable".to_string()))
        }

        fn put(&self, _record: &DraftRecord) -> StorageResult<()> {
            Err(StorageError::Migration("storage unavailable".to_string()))
        }

        fn delete(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Migration("storage unavailable".to_string()))
        }

        fn list(&self) -> StorageResult<Vec<DraftRecord>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_to_single_write() {
        let storage = Arc::new(CountingStore::new());
        let (_form, sink) = form_sink();
        let store = DraftStore::new("blog:create", Arc::clone(&storage) as Arc<dyn DraftStorage>, sink);

        store.initialize(None);

        for i in 1..=5 {
            store.observe(json!({"title": format!("draft {i}")}));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(storage.puts.load(Ordering::SeqCst), 1);
        let record = storage.get("blog:create").unwrap().unwrap();
        assert_eq!(record.data, json!({"title": "draft 5"}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_draft_wins_over_server_data() {
        let storage = Arc::new(MemoryDraftStore::new());
        storage
            .put(&DraftRecord::new("blog:edit:7".to_string(), json!({"a": 1})))
            .unwrap();

        let (form, sink) = form_sink();
        let store = DraftStore::new("blog:edit:7", Arc::clone(&storage) as Arc<dyn DraftStorage>, sink);

        let outcome = store.initialize(None);
        assert!(outcome.restored_from_draft);
        assert_eq!(store.phase(), DraftPhase::DraftActive);
        assert_eq!(*form.lock(), Some(json!({"a": 1})));

        // Late server data is never applied while the draft is active.
        store.server_data_ready(json!({"b": 2}));
        assert_eq!(*form.lock(), Some(json!({"a": 1})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_server_data_seeds_without_draft() {
        let storage = Arc::new(MemoryDraftStore::new());
        let (form, sink) = form_sink();
        let store = DraftStore::new("trip:edit:3", Arc::clone(&storage) as Arc<dyn DraftStorage>, sink);

        let outcome = store.initialize(None);
        assert!(!outcome.restored_from_draft);
        assert!(form.lock().is_none());

        store.server_data_ready(json!({"c": 3}));
        assert_eq!(*form.lock(), Some(json!({"c": 3})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_server_data_seeds_without_draft() {
        let storage = Arc::new(MemoryDraftStore::new());
        let (form, sink) = form_sink();
        let store = DraftStore::new("trip:edit:4", Arc::clone(&storage) as Arc<dyn DraftStorage>, sink);

        store.initialize(Some(json!({"c": 3})));
        assert_eq!(*form.lock(), Some(json!({"c": 3})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_reopens_seeding() {
        let storage = Arc::new(MemoryDraftStore::new());
        storage
            .put(&DraftRecord::new("plan:edit:9".to_string(), json!({"a": 1})))
            .unwrap();

        let (form, sink) = form_sink();
        let store = DraftStore::new("plan:edit:9", Arc::clone(&storage) as Arc<dyn DraftStorage>, sink);

        store.initialize(None);

        // Ignored while the draft is active, but remembered.
        store.server_data_ready(json!({"c": 3}));
        assert_eq!(*form.lock(), Some(json!({"a": 1})));

        store.discard();
        assert_eq!(store.phase(), DraftPhase::NoDraft);
        assert_eq!(*form.lock(), Some(json!({"c": 3})));
        assert!(storage.get("plan:edit:9").unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_is_idempotent() {
        let storage = Arc::new(MemoryDraftStore::new());
        let (form, sink) = form_sink();
        let store = DraftStore::new("query:edit:1", Arc::clone(&storage) as Arc<dyn DraftStorage>, sink);

        store.initialize(None);
        store.discard();
        store.discard();

        assert_eq!(store.phase(), DraftPhase::NoDraft);
        store.server_data_ready(json!({"c": 3}));
        assert_eq!(*form.lock(), Some(json!({"c": 3})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_before_initialize_never_writes() {
        let storage = Arc::new(CountingStore::new());
        let (_form, sink) = form_sink();
        let store = DraftStore::new("blog:create", Arc::clone(&storage) as Arc<dyn DraftStorage>, sink);

        // A stale initial form state must not clobber anything before the
        // load decision resolves.
        store.observe(json!({}));
        tokio::time::sleep(Duration::from_millis(2000)).await;

        assert_eq!(storage.puts.load(Ordering::SeqCst), 0);
        assert!(store.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_save_flips_phase() {
        let storage = Arc::new(MemoryDraftStore::new());
        let (_form, sink) = form_sink();
        let store = DraftStore::new("media:create", Arc::clone(&storage) as Arc<dyn DraftStorage>, sink);

        store.initialize(None);
        assert_eq!(store.phase(), DraftPhase::NoDraft);

        store.observe(json!({"caption": "sunset"}));
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(store.phase(), DraftPhase::DraftActive);
        assert!(storage.get("media:create").unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_cancels_pending_save() {
        let storage = Arc::new(CountingStore::new());
        let (_form, sink) = form_sink();
        let store = DraftStore::new("blog:edit:2", Arc::clone(&storage) as Arc<dyn DraftStorage>, sink);

        store.initialize(None);
        store.observe(json!({"title": "doomed"}));
        store.discard();

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(storage.puts.load(Ordering::SeqCst), 0);
        assert!(storage.get("blog:edit:2").unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failure_degrades_to_no_draft() {
        let (form, sink) = form_sink();
        let store = DraftStore::new("user:edit:5", Arc::new(BrokenStore), sink);

        let outcome = store.initialize(None);
        assert!(!outcome.restored_from_draft);
        assert!(!store.is_loading());
        assert_eq!(store.phase(), DraftPhase::NoDraft);

        // Still seeds from server data, and a failed delete stays silent.
        store.server_data_ready(json!({"name": "Priya"}));
        assert_eq!(*form.lock(), Some(json!({"name": "Priya"})));
        store.discard();
    }
}
