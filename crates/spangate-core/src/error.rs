use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Caller handed something other than a span collection where one was
    /// required (JSON null, object, scalar). Fatal to the call.
    #[error("span collection must be a JSON array, got {0}")]
    InvalidArgument(&'static str),

    /// Strict-mode normalization refused a record without a name.
    #[error("span record is missing a name")]
    MissingName,

    #[error("malformed span input: {0}")]
    Parse(#[from] serde_json::Error),
}
