use thiserror::Error;

/// Start input that yielded no usable source URL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no source urls provided")]
pub struct ValidationError;

/// A run-control request that did not complete.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server responded {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors surfaced by [`RunSession`](crate::session::RunSession) operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("run control failed: {0}")]
    Transport(#[from] TransportError),
}

impl SessionError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SessionError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
