//! Session expiry monitor
//!
//! Reconciles the token's expiry instant against wall-clock polling and
//! against ad-hoc expired-session signals published by API call sites.
//! The monitor never inspects HTTP responses itself.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use atlas_events::{SignalBus, Subscription};

use crate::state::SessionState;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

pub struct SessionMonitor {
    expired: Arc<AtomicBool>,
    poll_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
    _subscription: Subscription,
}

impl SessionMonitor {
    /// Subscribes to the expired-session signal for the monitor's
    /// lifetime. A received signal flags expiry immediately, regardless of
    /// what the periodic check currently believes.
    pub fn new(bus: &SignalBus) -> Self {
        Self::with_poll_interval(bus, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(bus: &SignalBus, poll_interval: Duration) -> Self {
        let expired = Arc::new(AtomicBool::new(false));

        let subscription = bus.subscribe({
            let expired = Arc::clone(&expired);
            move || {
                if !expired.swap(true, Ordering::SeqCst) {
                    tracing::info!("Session flagged expired by API signal");
                }
            }
        });

        Self {
            expired,
            poll_interval,
            task: Mutex::new(None),
            _subscription: subscription,
        }
    }

    /// Begin periodic expiry checking against an RFC 3339 expiry instant.
    ///
    /// Checks immediately, then on the poll interval. `None` or an
    /// unparseable instant fails closed: the session counts as already
    /// expired. Calling `start` again replaces the poll task but never
    /// clears an expired flag; only [`dismiss`](Self::dismiss) does.
    /// Requires a tokio runtime.
    pub fn start(&self, expires_at: Option<&str>) {
        let remaining = match expires_at {
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(instant) => (instant.with_timezone(&Utc) - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO),
                Err(e) => {
                    tracing::warn!(
                        expires_at = %raw,
                        error = %e,
                        "Unparseable session expiry, failing closed"
                    );
                    Duration::ZERO
                }
            },
            None => {
                tracing::debug!("No session expiry provided, failing closed");
                Duration::ZERO
            }
        };

        // Immediate check, before the first poll tick.
        let deadline = Instant::now() + remaining;
        if remaining.is_zero() {
            self.expired.store(true, Ordering::SeqCst);
        }

        let expired = Arc::clone(&self.expired);
        let poll_interval = self.poll_interval;

        // The poll keeps running after expiry so a dismissed prompt
        // re-flags on the next check against a still-past instant.
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                if Instant::now() >= deadline && !expired.swap(true, Ordering::SeqCst) {
                    tracing::info!("Session expiry instant passed");
                }
            }
        });

        let mut task = self.task.lock();
        if let Some(old) = task.replace(handle) {
            old.abort();
        }
    }

    /// Stop periodic checking. The signal subscription stays live.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SessionState {
        if self.is_expired() {
            SessionState::Expired
        } else {
            SessionState::Valid
        }
    }

    /// Clear the prompt after the UI has redirected to re-authenticate.
    /// Leaves the expiry instant and the subscription untouched, so a
    /// still-past instant re-flags on the next periodic check.
    pub fn dismiss(&self) {
        self.expired.store(false, Ordering::SeqCst);
        tracing::debug!("Session expiry prompt dismissed");
    }
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rfc3339_in(seconds: i64) -> String {
        (Utc::now() + chrono::Duration::seconds(seconds)).to_rfc3339()
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_expiry_fails_closed() {
        let bus = SignalBus::new();
        let monitor = SessionMonitor::new(&bus);

        monitor.start(None);
        assert!(monitor.is_expired());
        assert_eq!(monitor.state(), SessionState::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparseable_expiry_fails_closed() {
        let bus = SignalBus::new();
        let monitor = SessionMonitor::new(&bus);

        monitor.start(Some("not-a-date"));
        assert!(monitor.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_check_detects_expiry() {
        let bus = SignalBus::new();
        let monitor = SessionMonitor::with_poll_interval(&bus, Duration::from_secs(10));

        monitor.start(Some(rfc3339_in(90).as_str()));
        assert!(!monitor.is_expired());

        tokio::time::sleep(Duration::from_secs(50)).await;
        assert!(!monitor.is_expired());

        tokio::time::sleep(Duration::from_secs(50)).await;
        assert!(monitor.is_expired());

        // And stays expired.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(monitor.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_overrides_periodic_check() {
        let bus = SignalBus::new();
        let monitor = SessionMonitor::new(&bus);

        monitor.start(Some(rfc3339_in(3600).as_str()));
        assert!(!monitor.is_expired());

        // An API call site saw a 401 long before the instant passes.
        bus.publish();
        assert!(monitor.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_does_not_resurrect_validity() {
        let bus = SignalBus::new();
        let monitor = SessionMonitor::with_poll_interval(&bus, Duration::from_secs(10));

        monitor.start(Some(rfc3339_in(1).as_str()));
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(monitor.is_expired());

        monitor.dismiss();
        assert!(!monitor.is_expired());

        // The instant is still in the past; the next check re-flags.
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(monitor.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_never_clears_expired_flag() {
        let bus = SignalBus::new();
        let monitor = SessionMonitor::with_poll_interval(&bus, Duration::from_secs(10));

        bus.publish();
        assert!(monitor.is_expired());

        // A fresh, future expiry alone must not clear the prompt.
        monitor.start(Some(rfc3339_in(3600).as_str()));
        assert!(monitor.is_expired());

        monitor.dismiss();
        assert!(!monitor.is_expired());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!monitor.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_polling() {
        let bus = SignalBus::new();
        let monitor = SessionMonitor::with_poll_interval(&bus, Duration::from_secs(10));

        monitor.start(Some(rfc3339_in(1).as_str()));
        monitor.stop();
        monitor.dismiss();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!monitor.is_expired());
    }
}
