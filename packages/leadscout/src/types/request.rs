//! Search request, discovery channel, filters and run policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// Discovery channel a search runs against.
///
/// Channels differ in how identity is first established: `Maps` is
/// company-first (geographic/category search), `ProfessionalNetwork` is
/// person-first (indexed-profile text search). A channel never falls back
/// silently to the other; a zero-yield channel reports the shortfall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Maps,
    ProfessionalNetwork,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Maps => "maps",
            Channel::ProfessionalNetwork => "professional_network",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured filters applied on top of the free-text query.
///
/// Each non-empty category is rendered as a quoted OR-group; groups are
/// AND-ed together by juxtaposition in the job's query text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub job_titles: Vec<String>,
    #[serde(default)]
    pub company_sizes: Vec<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
            && self.industries.is_empty()
            && self.job_titles.is_empty()
            && self.company_sizes.is_empty()
    }

    /// Render the filters as AND-ed OR-groups, e.g.
    /// `("Madrid" OR "Barcelona") ("Healthcare" OR "Fitness")`.
    pub fn to_query_clause(&self) -> String {
        let mut groups = Vec::new();
        for category in [
            &self.locations,
            &self.industries,
            &self.job_titles,
            &self.company_sizes,
        ] {
            if let Some(group) = or_group(category) {
                groups.push(group);
            }
        }
        groups.join(" ")
    }
}

fn or_group(terms: &[String]) -> Option<String> {
    let quoted: Vec<String> = terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| format!("\"{}\"", t.trim()))
        .collect();
    match quoted.len() {
        0 => None,
        1 => Some(quoted.into_iter().next().unwrap_or_default()),
        _ => Some(format!("({})", quoted.join(" OR "))),
    }
}

/// One user-issued search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text query describing the businesses or people to find.
    pub query: String,

    /// Discovery channel, fixed for the whole run.
    pub channel: Channel,

    /// Number of qualified leads the caller expects back.
    pub quota: usize,

    /// Optional structured filters.
    #[serde(default)]
    pub filters: Option<SearchFilters>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, channel: Channel, quota: usize) -> Self {
        Self {
            query: query.into(),
            channel,
            quota,
            filters: None,
        }
    }

    /// Attach structured filters.
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Validate the request before a run starts.
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(SearchError::InvalidRequest {
                reason: "query must not be empty".into(),
            });
        }
        if self.quota == 0 {
            return Err(SearchError::InvalidRequest {
                reason: "quota must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Tunable policy for one search run.
///
/// Quota-over-precision tradeoffs are explicit, named fields rather than
/// implicit special cases, so tests can exercise both behaviors
/// deterministically.
#[derive(Debug, Clone)]
pub struct SearchPolicy {
    /// Attempt budget for the orchestrator's fetch/dedup/enrich loop.
    pub max_attempts: u32,

    /// Over-fetch multiplier applied to the current deficit. Empirical yield
    /// from raw candidate to qualified lead is low (~20%), so each attempt
    /// requests several times what is still needed.
    pub overfetch_factor: usize,

    /// Candidates enriched concurrently per batch.
    pub enrich_batch_size: usize,

    /// AI synthesis retries before degrading to a placeholder analysis.
    pub synthesis_retries: u32,

    /// Fixed backoff between synthesis retries.
    pub synthesis_backoff: Duration,

    /// Wall-clock budget for the whole run.
    pub run_budget: Duration,

    /// Outer retry count for the buffer engine around the orchestrator.
    pub engine_iterations: u32,

    /// Accept a last-resort unfiltered candidate slice when the final
    /// attempt would otherwise yield nothing. Trades precision for quota.
    pub allow_duplicates_on_final_attempt: bool,

    /// Assign a synthesized `contact@<domain>` address when no email can be
    /// discovered for a candidate with a known domain.
    pub placeholder_contact_email: bool,

    /// Enable the aggressive dedup criteria (domain variants, substring
    /// containment). Fewer false negatives, more false positives.
    pub strict_dedup: bool,

    /// Region assumed when the query carries no location.
    pub default_region: String,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            overfetch_factor: 5,
            enrich_batch_size: 5,
            synthesis_retries: 3,
            synthesis_backoff: Duration::from_secs(1),
            run_budget: Duration::from_secs(10 * 60),
            engine_iterations: 2,
            allow_duplicates_on_final_attempt: false,
            placeholder_contact_email: true,
            strict_dedup: false,
            default_region: "Spain".to_string(),
        }
    }
}

impl SearchPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_overfetch_factor(mut self, factor: usize) -> Self {
        self.overfetch_factor = factor;
        self
    }

    pub fn with_run_budget(mut self, budget: Duration) -> Self {
        self.run_budget = budget;
        self
    }

    pub fn with_engine_iterations(mut self, iterations: u32) -> Self {
        self.engine_iterations = iterations;
        self
    }

    pub fn allow_duplicates_on_final_attempt(mut self, allow: bool) -> Self {
        self.allow_duplicates_on_final_attempt = allow;
        self
    }

    pub fn placeholder_contact_email(mut self, enabled: bool) -> Self {
        self.placeholder_contact_email = enabled;
        self
    }

    pub fn with_strict_dedup(mut self, strict: bool) -> Self {
        self.strict_dedup = strict;
        self
    }

    pub fn with_default_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = region.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_zero_quota() {
        let request = SearchRequest::new("dentists madrid", Channel::Maps, 0);
        assert!(request.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_query() {
        let request = SearchRequest::new("   ", Channel::Maps, 5);
        assert!(request.validate().is_err());
    }

    #[test]
    fn filter_clause_renders_and_of_or_groups() {
        let filters = SearchFilters {
            locations: vec!["Madrid".into(), "Barcelona".into()],
            industries: vec!["Healthcare".into()],
            job_titles: vec![],
            company_sizes: vec![],
        };
        assert_eq!(
            filters.to_query_clause(),
            "(\"Madrid\" OR \"Barcelona\") \"Healthcare\""
        );
    }

    #[test]
    fn empty_filters_render_empty_clause() {
        assert_eq!(SearchFilters::default().to_query_clause(), "");
        assert!(SearchFilters::default().is_empty());
    }
}
