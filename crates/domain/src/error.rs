/// Shared error type used across all viva crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store: {0}")]
    Store(String),

    #[error("queue: {0}")]
    Queue(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("protocol: {0}")]
    Protocol(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
