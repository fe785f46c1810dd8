use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ActorRun {
    pub id: String,
    pub status: String,
    #[serde(rename = "statusMessage")]
    pub status_message: Option<String>,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ActorRun {
    pub fn run_status(&self) -> RunStatus {
        RunStatus::parse(&self.status)
    }
}

/// Lifecycle status of an actor run.
///
/// Apify reports transitional statuses (`TIMING-OUT`, `ABORTING`) before the
/// corresponding terminal ones; both map to the same variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
}

impl RunStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "READY" => Self::Queued,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "TIMED-OUT" | "TIMING-OUT" => Self::TimedOut,
            "ABORTED" | "ABORTING" => Self::Aborted,
            _ => Self::Running,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::TimedOut | Self::Aborted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_statuses() {
        assert_eq!(RunStatus::parse("READY"), RunStatus::Queued);
        assert_eq!(RunStatus::parse("RUNNING"), RunStatus::Running);
        assert_eq!(RunStatus::parse("SUCCEEDED"), RunStatus::Succeeded);
        assert_eq!(RunStatus::parse("TIMING-OUT"), RunStatus::TimedOut);
        assert_eq!(RunStatus::parse("ABORTING"), RunStatus::Aborted);
    }

    #[test]
    fn unknown_status_is_running() {
        // The API occasionally grows new transitional statuses; treating them
        // as still-running leaves the poll loop in charge of termination.
        assert_eq!(RunStatus::parse("MIGRATING"), RunStatus::Running);
        assert!(!RunStatus::parse("MIGRATING").is_terminal());
    }

    #[test]
    fn terminal_statuses() {
        assert!(RunStatus::Succeeded.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }
}
