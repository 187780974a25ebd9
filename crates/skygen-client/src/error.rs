use thiserror::Error;

/// Errors raised by event store clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{context} failed with status {status}: {body}")]
    Status {
        context: String,
        status: u16,
        body: String,
    },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event channel closed: {0}")]
    ChannelClosed(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("server unreachable: {0}")]
    Unreachable(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
