use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("Media storage error: {0}")]
    Storage(#[from] common::storage::StorageError),

    #[error("Stream error: {0}")]
    Stream(#[from] crate::stream::StreamError),

    #[error("Event queue closed")]
    QueueClosed,

    #[error("{0} queued events were abandoned during shutdown")]
    Abandoned(usize),
}

pub type Result<T> = std::result::Result<T, IngestError>;
