//! Skycast error type.

use thiserror::Error;

/// Errors raised anywhere in the broadcast pipeline.
#[derive(Debug, Error)]
pub enum SkycastError {
    /// Persisted recipient state could not be read or parsed.
    /// Never fatal: the store degrades to an empty set.
    #[error("Storage read error: {0}")]
    StorageRead(String),

    /// Persisted recipient state could not be written.
    #[error("Storage write error: {0}")]
    StorageWrite(String),

    /// Weather fetch failed, timed out or returned a malformed body.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A single message could not be delivered to a recipient.
    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SkycastError>;
