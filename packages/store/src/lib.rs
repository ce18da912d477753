pub mod analytics;
pub mod database;
pub mod entity;
pub mod error;
pub mod persist;

pub use error::{Result, StoreError};
pub use persist::{MediaContent, StoredMedia, UpsertOutcome, persist_event};
