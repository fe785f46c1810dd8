//! AI text oracle trait.
//!
//! The oracle serves two calls: turning a free-text query into a structured
//! search intent, and synthesizing a qualitative analysis for an enriched
//! lead. Both contracts are request/response JSON; absence of credentials
//! must never crash the pipeline — callers fall back deterministically.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, SearchError};
use crate::types::{ActivitySignal, Channel, Lead};

/// Structured interpretation of a free-text query.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpretedQuery {
    pub search_query: String,
    pub industry: String,
    pub target_roles: Vec<String>,
    pub location: String,
}

/// Default decision-maker roles targeted when the oracle cannot refine them.
pub const DEFAULT_TARGET_ROLES: [&str; 4] = ["CEO", "Founder", "Owner", "General Manager"];

impl InterpretedQuery {
    /// Deterministic fallback: the raw query is the search term, roles and
    /// region take their defaults.
    pub fn fallback(query: &str, default_region: &str) -> Self {
        Self {
            search_query: query.to_string(),
            industry: query.to_string(),
            target_roles: DEFAULT_TARGET_ROLES.iter().map(|r| r.to_string()).collect(),
            location: default_region.to_string(),
        }
    }
}

/// Qualitative analysis returned by the oracle for one lead.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResponse {
    pub executive_summary: String,
    pub bottleneck: String,
    pub psychological_profile: String,
    pub business_moment: String,
    pub sales_angle: String,
    pub outreach_message: String,
    pub ad_status: ActivitySignal,
    pub social_status: ActivitySignal,
    /// Owner name spotted in the research material, if any.
    pub detected_owner: Option<String>,
}

/// The AI text oracle.
#[async_trait]
pub trait Analyst: Send + Sync {
    /// Interpret a free-text query into a structured search intent.
    async fn interpret_query(&self, query: &str, channel: Channel) -> Result<InterpretedQuery>;

    /// Synthesize a qualitative analysis from a lead and its research notes.
    async fn analyze_lead(&self, lead: &Lead, research: &str) -> Result<AnalysisResponse>;
}

/// Scripted analyst for testing.
#[derive(Default)]
pub struct MockAnalyst {
    interpretation: Option<InterpretedQuery>,
    analysis: Option<AnalysisResponse>,
    fail_interpret: bool,
    /// Number of analyze calls that fail before responses succeed.
    analyze_failures: Mutex<u32>,
    /// Artificial latency per analyze call, for cancellation tests.
    latency: Option<Duration>,
    pub analyze_calls: Mutex<u32>,
}

impl MockAnalyst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interpretation(mut self, interpretation: InterpretedQuery) -> Self {
        self.interpretation = Some(interpretation);
        self
    }

    pub fn with_analysis(mut self, analysis: AnalysisResponse) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn failing_interpretation(mut self) -> Self {
        self.fail_interpret = true;
        self
    }

    /// Fail the first `count` analyze calls, then succeed.
    pub fn with_analyze_failures(self, count: u32) -> Self {
        *self.analyze_failures.lock().unwrap() = count;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl Analyst for MockAnalyst {
    async fn interpret_query(&self, query: &str, _channel: Channel) -> Result<InterpretedQuery> {
        if self.fail_interpret {
            return Err(SearchError::oracle("scripted interpretation failure"));
        }
        Ok(self
            .interpretation
            .clone()
            .unwrap_or_else(|| InterpretedQuery::fallback(query, "Spain")))
    }

    async fn analyze_lead(&self, lead: &Lead, _research: &str) -> Result<AnalysisResponse> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        *self.analyze_calls.lock().unwrap() += 1;
        {
            let mut failures = self.analyze_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(SearchError::oracle("scripted analysis failure"));
            }
        }
        Ok(self.analysis.clone().unwrap_or_else(|| AnalysisResponse {
            executive_summary: format!("{} overview", lead.company_name),
            bottleneck: "Outdated web presence".to_string(),
            ..Default::default()
        }))
    }
}
