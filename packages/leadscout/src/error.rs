//! Typed errors for the lead discovery pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Collaborator failures are
//! wrapped as boxed sources so the pipeline stays decoupled from any
//! specific provider crate.

use thiserror::Error;

/// Errors that can occur during a search run.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Required configuration is missing (e.g. the job provider token).
    #[error("missing configuration: {0}")]
    Config(String),

    /// The search request failed validation.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The remote job provider failed.
    #[error("job provider error: {0}")]
    Job(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The AI text oracle failed.
    #[error("AI oracle error: {0}")]
    Oracle(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The owner/email resolver failed.
    #[error("owner resolver error: {0}")]
    Resolver(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The lead history store failed.
    #[error("history store error: {0}")]
    History(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The run was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl SearchError {
    /// Wrap an arbitrary error as a job provider failure.
    pub fn job(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Job(err.into())
    }

    /// Wrap an arbitrary error as an oracle failure.
    pub fn oracle(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Oracle(err.into())
    }

    /// Wrap an arbitrary error as a resolver failure.
    pub fn resolver(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Resolver(err.into())
    }

    /// Wrap an arbitrary error as a history store failure.
    pub fn history(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::History(err.into())
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, SearchError>;
