//! Pure Apify REST API client.
//!
//! A minimal client for the Apify platform API. Supports starting actor runs,
//! polling for completion with stuck-run detection, and fetching dataset
//! results.
//!
//! # Example
//!
//! ```rust,ignore
//! use apify_client::{ApifyClient, PollPolicy};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = ApifyClient::new("your-api-token");
//! let input = serde_json::json!({ "searchStringsArray": ["dentists madrid"] });
//!
//! let items: Vec<serde_json::Value> = client
//!     .run_to_completion("nwua9Gu5YrADL7ZDj", &input, &PollPolicy::default(), &CancellationToken::new())
//!     .await?;
//! ```

pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{ActorRun, ApiResponse, RunStatus};

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Polling policy for actor runs.
///
/// Runs are polled at a fixed `interval` up to `max_polls` times. A run whose
/// status and status message stay unchanged for more than `stuck_after`
/// consecutive polls while not terminal is treated as stuck, which bounds the
/// worst-case wait against a misbehaving actor.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_polls: u32,
    pub stuck_after: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_polls: 30,
            stuck_after: 10,
        }
    }
}

impl PollPolicy {
    /// Set the poll interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the maximum number of polls before giving up on the run.
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Set the unchanged-poll count after which a run is considered stuck.
    pub fn with_stuck_after(mut self, stuck_after: u32) -> Self {
        self.stuck_after = stuck_after;
        self
    }
}

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl ApifyClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (for proxies and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_run<I: Serialize + ?Sized>(
        &self,
        actor_id: &str,
        input: &I,
    ) -> Result<ActorRun> {
        let url = format!("{}/acts/{}/runs", self.base_url, actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<ActorRun> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Fetch current metadata for a run.
    pub async fn run_status(&self, run_id: &str) -> Result<ActorRun> {
        let url = format!("{}/actor-runs/{}", self.base_url, run_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<ActorRun> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Fetch dataset items from a run's default dataset.
    pub async fn dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", self.base_url, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let items: Vec<T> = resp.json().await?;
        Ok(items)
    }

    /// Run an actor end-to-end: start the run, poll until it finishes, fetch
    /// the dataset items.
    ///
    /// Polling follows `policy`. Outcomes:
    /// - terminal success: full dataset returned;
    /// - terminal failure (`FAILED`/`ABORTED`/`TIMED-OUT`): [`ApifyError::RunFailed`];
    /// - no observable progress for more than `policy.stuck_after` consecutive
    ///   polls: [`ApifyError::Stuck`];
    /// - poll cap exhausted without a terminal status: whatever dataset items
    ///   have already materialized are returned instead of an error;
    /// - `cancel` fired: an empty item set, checked once per poll.
    pub async fn run_to_completion<I, T>(
        &self,
        actor_id: &str,
        input: &I,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>>
    where
        I: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let run = self.start_run(actor_id, input).await?;
        tracing::info!(actor_id, run_id = %run.id, "Actor run started, polling");

        let dataset_id = run.default_dataset_id.clone();
        let mut last_observed = (run.status.clone(), run.status_message.clone());
        let mut unchanged_polls: u32 = 0;

        for poll in 1..=policy.max_polls {
            if cancel.is_cancelled() {
                tracing::info!(run_id = %run.id, poll, "Cancelled while polling, returning empty set");
                return Ok(Vec::new());
            }

            tokio::time::sleep(policy.interval).await;

            let current = self.run_status(&run.id).await?;
            match current.run_status() {
                RunStatus::Succeeded => {
                    tracing::info!(run_id = %run.id, poll, "Run succeeded, fetching dataset");
                    return self.dataset_items(&dataset_id).await;
                }
                RunStatus::Failed | RunStatus::Aborted | RunStatus::TimedOut => {
                    return Err(ApifyError::RunFailed {
                        status: current.status,
                    });
                }
                RunStatus::Queued | RunStatus::Running => {
                    let observed = (current.status.clone(), current.status_message.clone());
                    if observed == last_observed {
                        unchanged_polls += 1;
                        if unchanged_polls > policy.stuck_after {
                            return Err(ApifyError::Stuck {
                                run_id: run.id,
                                polls: unchanged_polls,
                            });
                        }
                    } else {
                        unchanged_polls = 0;
                        last_observed = observed;
                    }
                    tracing::debug!(run_id = %run.id, poll, status = %current.status, "Run still in progress");
                }
            }
        }

        // Poll cap reached without a terminal status: degrade to whatever the
        // actor has produced so far rather than failing the caller.
        tracing::warn!(
            run_id = %run.id,
            max_polls = policy.max_polls,
            "Poll cap reached, returning partial dataset"
        );
        self.dataset_items(&dataset_id).await
    }
}
