pub mod config;
pub mod consumer;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod queue;
pub mod shutdown;
pub mod stream;
pub mod timeline;

pub use error::{IngestError, Result};
