//! Expired-session signal bus
//!
//! A minimal broadcast primitive with an explicit lifecycle: construct one
//! at application start and hand it by reference to producers (API call
//! sites) and consumers (the session monitor). Dispatch is synchronous in
//! registration order over a snapshot of the current subscribers, so
//! unsubscribing during a dispatch pass never affects that pass.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Callback = Arc<dyn Fn() + Send + Sync>;

struct Entry {
    id: u64,
    callback: Callback,
}

struct Inner {
    subscribers: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

pub struct SignalBus {
    inner: Arc<Inner>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register a subscriber. The callback stays registered until the
    /// returned handle is unsubscribed or dropped.
    #[must_use]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().push(Entry {
            id,
            callback: Arc::new(callback),
        });

        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke every currently-registered subscriber exactly once,
    /// synchronously, in registration order.
    pub fn publish(&self) {
        // Snapshot under the lock, dispatch outside it. A callback may
        // subscribe or unsubscribe without deadlocking, and changes only
        // apply to subsequent publishes.
        let snapshot: Vec<Callback> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|entry| Arc::clone(&entry.callback))
            .collect();

        tracing::debug!(subscribers = snapshot.len(), "Publishing expired-session signal");

        for callback in snapshot {
            callback();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SignalBus {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Handle to a registered subscriber. Unsubscribes on drop.
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.subscribers.lock().retain(|entry| entry.id != self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
