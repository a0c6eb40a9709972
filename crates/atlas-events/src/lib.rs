//! ATLAS Event Channel
//!
//! In-memory, tab-local publish/subscribe channel used to fan out
//! "session expired" notifications from API call sites to the session
//! monitor. Not persisted; resets on full restart.

mod bus;

pub use bus::{SignalBus, Subscription};
