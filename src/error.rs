use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure while turning an inbound exchange into capture fields.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("failed to read request body: {0}")]
    ReadBody(#[source] BoxError),
}

/// Failure while writing a captured message.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{field} exceeds {limit} characters (got {actual})")]
    FieldTooLong {
        field: &'static str,
        limit: usize,
        actual: usize,
    },

    #[error("storage task failed: {0}")]
    Task(String),
}

/// Anything that can stop a capture at the endpoint boundary.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Invalid startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Args(#[from] clap::Error),

    #[error("port should contain port number: {0}")]
    InvalidPort(String),

    #[error("bind should contain an ip address: {0}")]
    InvalidBind(String),
}
