//! Error types for schema walking and configuration.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchemaError>;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("malformed node at {path}: {reason}")]
    MalformedNode { path: String, reason: String },

    #[error("compound field `{field}` at {path} has no `properties` mapping")]
    MissingProperties { field: String, path: String },

    #[error("record `{record}` is re-entered while still being resolved (at {path})")]
    Cyclic { record: String, path: String },

    #[error("nesting depth {depth} exceeds the limit of {limit} (at {path})")]
    DepthLimit { depth: usize, limit: usize, path: String },

    #[error("invalid config at {path}: {message}")]
    Config { path: String, message: String },

    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SchemaError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        Self::MalformedNode { path: display_path(path), reason: reason.into() }
    }
}

/// The document root renders as `/`.
pub(crate) fn display_path(path: &str) -> String {
    if path.is_empty() { "/".to_string() } else { path.to_string() }
}
