//! Repository fetcher trait - reads file contents from the source repository.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("timed out fetching {path}")]
    Timeout { path: String },

    #[error("{path} not found at {commit}")]
    NotFound { path: String, commit: String },

    #[error("fetching {path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("transport error fetching {path}: {message}")]
    Transport { path: String, message: String },

    #[error("invalid repository path: {path}")]
    InvalidPath { path: String },

    #[error("{path} is not valid UTF-8")]
    Encoding { path: String },
}

impl FetchError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::NotFound { .. }
            | FetchError::InvalidPath { .. }
            | FetchError::Encoding { .. } => false,
        }
    }

    /// The file was fetched but its content is unusable. This is a problem
    /// with that one file, not with the notification.
    pub fn is_file_level(&self) -> bool {
        matches!(self, FetchError::Encoding { .. })
    }

    pub fn path(&self) -> &str {
        match self {
            FetchError::Timeout { path }
            | FetchError::NotFound { path, .. }
            | FetchError::Status { path, .. }
            | FetchError::Transport { path, .. }
            | FetchError::InvalidPath { path }
            | FetchError::Encoding { path } => path,
        }
    }
}

#[async_trait]
pub trait RepositoryFetcher: Send + Sync {
    /// Fetch the content of `path` as of `commit` in `repository`.
    async fn fetch(&self, repository: &str, commit: &str, path: &str) -> Result<String, FetchError>;
}
