//! Error types for the dashboard pipeline

use thiserror::Error;

/// Notice shown to the user whenever a fetch fails, regardless of cause
pub const RETRIEVAL_FAILED: &str = "failed to retrieve information";

/// Errors produced by the resource facade and the pipeline around it
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Network failure, timeout or connection refused
    #[error("failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-2xx status
    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    /// The body could not be decoded into the expected shape
    #[error("failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Base URL or request path could not be built
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A namespace or name that cannot be used as a single path segment
    #[error("invalid path segment: {0:?}")]
    InvalidSegment(String),

    /// A kind slug or token outside the registry
    #[error("unknown workload kind: {0:?}")]
    UnknownKind(String),
}

impl DashboardError {
    /// Returns true for failures of the HTTP exchange itself
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DashboardError::Transport(_) | DashboardError::Status { .. } | DashboardError::Decode(_)
        )
    }
}

pub type Result<T, E = DashboardError> = std::result::Result<T, E>;
