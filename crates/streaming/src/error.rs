use std::time::Duration;

use thiserror::Error;

/// Why a place fetch produced no usable data.
///
/// Cancellation is deliberately absent: a superseded fetch never reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected response status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Transport-level failures (including timeouts), as opposed to bad responses.
    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Timeout(_))
    }
}

/// A place query string the server cannot interpret.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("missing query parameter `{0}`")]
    Missing(&'static str),

    #[error("invalid value `{value}` for `{key}`")]
    Invalid { key: String, value: String },
}
