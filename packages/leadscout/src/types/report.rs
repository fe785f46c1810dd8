//! Run-level outputs: buffered leads, metrics, reports, history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lead::Lead;
use super::request::Channel;

/// Buffer stage of a lead inside the guarantee engine.
///
/// Derived once from the lead's attributes on ingestion, then only advanced
/// by guarantee promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferStage {
    /// Company identified, no verified email.
    Raw,
    /// Has a non-placeholder email.
    Discovered,
    /// Email plus partial analysis.
    Enriched,
    /// Fully analyzed, quota-eligible.
    Ready,
}

impl BufferStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BufferStage::Raw => "raw",
            BufferStage::Discovered => "discovered",
            BufferStage::Enriched => "enriched",
            BufferStage::Ready => "ready",
        }
    }
}

/// A lead annotated with pipeline metadata while it sits in the buffer.
#[derive(Debug, Clone)]
pub struct BufferedLead {
    pub lead: Lead,
    pub stage: BufferStage,
    /// Engine iteration the lead arrived in.
    pub attempt: u32,
    pub channel: Channel,
}

/// Summary of one search run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub candidates_seen: usize,
    pub duplicates_found: usize,
    pub attempts_used: u32,
    /// Ready-count / candidates-seen, computed once at completion.
    pub success_rate: f64,
    pub elapsed_ms: u64,
}

impl RunMetrics {
    /// Compute the final success rate. Called exactly once, at completion.
    pub fn finalize(&mut self, ready_count: usize, elapsed_ms: u64) {
        self.success_rate = if self.candidates_seen > 0 {
            ready_count as f64 / self.candidates_seen as f64
        } else {
            0.0
        };
        self.elapsed_ms = elapsed_ms;
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Quota met.
    Completed,
    /// Fewer leads than requested, after exhausting every fallback.
    ShortDelivery,
    /// Stopped by the caller.
    Cancelled,
    /// Run-level fatal error; the report still carries any partial leads.
    Failed(String),
}

/// The result a caller receives, exactly once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub leads: Vec<Lead>,
    pub metrics: RunMetrics,
    pub outcome: RunOutcome,
}

/// Whether a run was started by a user or a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOrigin {
    Manual,
    Scheduled,
}

/// A completed run as persisted to lead history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedRun {
    pub id: Uuid,
    pub query: String,
    pub channel: Channel,
    pub leads: Vec<Lead>,
    pub origin: RunOrigin,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_stages_order_by_completeness() {
        assert!(BufferStage::Raw < BufferStage::Discovered);
        assert!(BufferStage::Discovered < BufferStage::Enriched);
        assert!(BufferStage::Enriched < BufferStage::Ready);
    }

    #[test]
    fn success_rate_guards_division_by_zero() {
        let mut metrics = RunMetrics::default();
        metrics.finalize(5, 100);
        assert_eq!(metrics.success_rate, 0.0);

        metrics.candidates_seen = 20;
        metrics.finalize(5, 100);
        assert_eq!(metrics.success_rate, 0.25);
        assert_eq!(metrics.elapsed_ms, 100);
    }
}
