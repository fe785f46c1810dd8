//! Persisted lead history.
//!
//! The history store seeds the dedup index at run start (all prior leads for
//! the user, plus an explicit blacklist of identity keys) and receives each
//! completed run. Persistence beyond process lifetime is the embedding
//! application's concern; the in-memory implementation below is enough for
//! the pipeline and its tests.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CompletedRun, Lead};

/// Lead history collaborator.
#[async_trait]
pub trait LeadHistory: Send + Sync {
    /// All previously delivered leads, used to seed the dedup index.
    async fn prior_leads(&self) -> Result<Vec<Lead>>;

    /// Explicitly blacklisted identity keys (domains, emails, names).
    async fn blacklist(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Append a completed run.
    async fn record_run(&self, run: &CompletedRun) -> Result<()>;
}

/// In-memory lead history.
#[derive(Default)]
pub struct MemoryHistory {
    runs: RwLock<Vec<CompletedRun>>,
    seed_leads: RwLock<Vec<Lead>>,
    blacklist: RwLock<Vec<String>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate history with already-delivered leads.
    pub fn with_leads(self, leads: Vec<Lead>) -> Self {
        *self.seed_leads.write().unwrap() = leads;
        self
    }

    /// Pre-populate the blacklist.
    pub fn with_blacklist(self, keys: Vec<String>) -> Self {
        *self.blacklist.write().unwrap() = keys;
        self
    }

    /// Runs recorded so far.
    pub fn recorded_runs(&self) -> usize {
        self.runs.read().unwrap().len()
    }
}

#[async_trait]
impl LeadHistory for MemoryHistory {
    async fn prior_leads(&self) -> Result<Vec<Lead>> {
        let mut leads = self.seed_leads.read().unwrap().clone();
        for run in self.runs.read().unwrap().iter() {
            leads.extend(run.leads.iter().cloned());
        }
        Ok(leads)
    }

    async fn blacklist(&self) -> Result<Vec<String>> {
        Ok(self.blacklist.read().unwrap().clone())
    }

    async fn record_run(&self, run: &CompletedRun) -> Result<()> {
        self.runs.write().unwrap().push(run.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Candidate, Channel, RunOrigin};
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn recorded_runs_feed_prior_leads() {
        let history = MemoryHistory::new();
        assert!(history.prior_leads().await.unwrap().is_empty());

        let lead = Lead::from_candidate(&Candidate::new("Acme", Some("acme.com")), Channel::Maps);
        history
            .record_run(&CompletedRun {
                id: Uuid::new_v4(),
                query: "gyms".into(),
                channel: Channel::Maps,
                leads: vec![lead],
                origin: RunOrigin::Manual,
                completed_at: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(history.recorded_runs(), 1);
        assert_eq!(history.prior_leads().await.unwrap().len(), 1);
    }
}
