pub mod config;
pub mod event;
pub mod language;
pub mod retry;
pub mod storage;

pub use event::{Author, MediaRef, Status, StreamMessage};
pub use language::LanguageFilter;
