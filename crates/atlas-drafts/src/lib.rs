//! ATLAS Draft Recovery
//!
//! Lets a form recover unsaved work after a reload or navigation without
//! the backend knowing about drafts, and without clobbering fresh data
//! loaded from the server. One `DraftStore` per mounted form instance;
//! drafts never bleed across keys.

mod debounce;
mod phase;
mod store;

pub use debounce::Debouncer;
pub use phase::DraftPhase;
pub use store::{DraftStore, LoadOutcome, DEFAULT_DEBOUNCE};
