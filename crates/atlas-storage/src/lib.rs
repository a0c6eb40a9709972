//! ATLAS Storage Layer
//!
//! Local, durable persistence for in-progress form drafts. Drafts survive
//! restarts and are only ever removed by an explicit discard; there is no
//! TTL or size-based eviction.

mod database;
mod draft;
mod error;
mod migrations;

pub use database::Database;
pub use draft::{DraftRecord, DraftStorage, MemoryDraftStore};
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
