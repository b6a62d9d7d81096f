//! Application-wide error types.

use stream_accounting::StreamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Account decode error: {0}")]
    AccountDecode(String),

    #[error("Corrupt stream row {id}: {reason}")]
    CorruptRow { id: String, reason: String },

    #[error("Invalid stream: {0}")]
    Stream(#[from] StreamError),
}

pub type Result<T> = std::result::Result<T, IndexerError>;
