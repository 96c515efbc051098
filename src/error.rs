//! Error types returned by the resolution core.

use serde::Serialize;

/// An error reported by the upstream API, or a transport failure reaching it.
///
/// `code` carries the TMDb `status_code` when the API answered with an error
/// payload, the HTTP status when it answered without one, and `0` when the
/// request never completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("upstream error {code}: {message}")]
pub struct UpstreamError {
    pub code: u32,
    pub message: String,
}

impl UpstreamError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Rejected before any network call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The search legitimately matched nothing.
    #[error("no result: {0}")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ResolveError {
    /// Stable machine-readable code used by the JSON envelope.
    pub fn code(&self) -> String {
        match self {
            ResolveError::Validation(_) => "invalid".to_string(),
            ResolveError::NotFound(_) => "empty".to_string(),
            ResolveError::Upstream(e) => e.code.to_string(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            ResolveError::Validation(m) | ResolveError::NotFound(m) => m.clone(),
            ResolveError::Upstream(e) => e.message.clone(),
        }
    }
}
