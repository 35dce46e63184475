use thiserror::Error;

/// Error type returned by custom format callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Cannot convert delta with non-insert operations (found {kind} at op {index})")]
    NonInsertOperation { index: usize, kind: &'static str },

    #[error("Custom format `{attribute}` failed: {source}")]
    Callback {
        attribute: String,
        #[source]
        source: CallbackError,
    },

    #[error("HTML serialization failed: {0}")]
    Serialization(String),

    #[error("Invalid delta JSON: {0}")]
    Json(#[from] serde_json::Error),
}
