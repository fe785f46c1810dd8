use thiserror::Error;

/// Errors returned by the Apify client.
#[derive(Debug, Error)]
pub enum ApifyError {
    /// Transport-level failure talking to the API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status code.
    #[error("Apify API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The actor run reached a terminal failure status.
    #[error("actor run failed with status {status}")]
    RunFailed { status: String },

    /// The run reported no progress across too many consecutive polls.
    #[error("actor run {run_id} stuck after {polls} unchanged polls")]
    Stuck { run_id: String, polls: u32 },
}

/// Result type alias for Apify operations.
pub type Result<T> = std::result::Result<T, ApifyError>;
