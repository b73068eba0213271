use thiserror::Error;

/// Main error type for relsearch
#[derive(Error, Debug)]
pub enum RelsearchError {
    /// Transport or non-success HTTP status from a remote service
    #[error("HTTP error: {0}")]
    Http(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A bulk record is missing a field or carries a non-integer id
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// A name that is not present in the graph
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// Parse errors (model replies, service payloads)
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenient Result type using RelsearchError
pub type Result<T> = std::result::Result<T, RelsearchError>;
