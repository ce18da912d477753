use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),

    #[error("Identifier {0} does not fit a signed 64-bit column")]
    IdOutOfRange(u64),
}

impl StoreError {
    /// Two writers raced to insert the same key.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::Db(e) => is_unique_violation(e),
            _ => false,
        }
    }

    /// The session itself is gone; retrying the next event will not help.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            StoreError::Db(DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
        )
    }
}

pub fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub type Result<T> = std::result::Result<T, StoreError>;
