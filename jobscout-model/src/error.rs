use std::fmt::{self, Display};

/// Errors produced while decoding or validating model values.
#[derive(Debug)]
pub enum ModelError {
    /// A stream frame could not be decoded into an event or log payload.
    Decode(String),
    /// A server-assigned run identifier was empty.
    EmptyRunId,
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Decode(msg) => write!(f, "decode error: {msg}"),
            ModelError::EmptyRunId => write!(f, "run id must not be empty"),
        }
    }
}

impl std::error::Error for ModelError {}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
