//! Owner/email resolver trait.
//!
//! Given a company, the resolver tries to identify its decision maker and a
//! direct contact address. Implementations range from paid enrichment APIs
//! to the search-backed resolver below; the enrichment chain treats a `None`
//! answer (or any error) as "fall back to the generic contact scrape".

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::channels::parse_person_title;
use crate::error::Result;
use crate::traits::jobs::JobRunner;

/// A resolved decision-maker profile.
#[derive(Debug, Clone, Default)]
pub struct OwnerProfile {
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    /// Resolver's own confidence in the match, 0.0-1.0.
    pub confidence: f32,
    /// Where the profile came from (provider name, "serp", etc.).
    pub source: String,
}

/// Owner/email discovery collaborator.
#[async_trait]
pub trait OwnerResolver: Send + Sync {
    async fn discover_owner(
        &self,
        company: &str,
        website: &str,
        industry: &str,
        location: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<OwnerProfile>>;
}

/// Search-backed resolver: runs targeted web searches for the company's
/// leadership and parses `"Name - Role - Company"` titles out of the results.
pub struct SerpOwnerResolver {
    jobs: Arc<dyn JobRunner>,
}

impl SerpOwnerResolver {
    pub fn new(jobs: Arc<dyn JobRunner>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl OwnerResolver for SerpOwnerResolver {
    async fn discover_owner(
        &self,
        company: &str,
        _website: &str,
        _industry: &str,
        location: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<OwnerProfile>> {
        let queries = vec![
            format!("\"{company}\" CEO OR Founder OR Owner {location}"),
            format!("\"{company}\" linkedin team"),
        ];

        let pages = self.jobs.search_web(&queries, 4, cancel).await?;

        for page in &pages {
            for result in &page.organic_results {
                let Some(person) = parse_person_title(&result.title) else {
                    continue;
                };
                let is_profile_url = result.url.to_lowercase().contains("linkedin.com/in");
                let profile = OwnerProfile {
                    name: Some(person.name),
                    role: person.role,
                    email: None,
                    linkedin: is_profile_url.then(|| result.url.clone()),
                    confidence: if is_profile_url { 0.6 } else { 0.4 },
                    source: "serp".to_string(),
                };
                tracing::debug!(company, owner = ?profile.name, "Owner resolved from search titles");
                return Ok(Some(profile));
            }
        }

        Ok(None)
    }
}

/// Scripted resolver for testing, keyed by company name.
#[derive(Default)]
pub struct MockOwnerResolver {
    profiles: Mutex<HashMap<String, OwnerProfile>>,
    fail: bool,
}

impl MockOwnerResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(self, company: &str, profile: OwnerProfile) -> Self {
        self.profiles
            .lock()
            .unwrap()
            .insert(company.to_string(), profile);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl OwnerResolver for MockOwnerResolver {
    async fn discover_owner(
        &self,
        company: &str,
        _website: &str,
        _industry: &str,
        _location: &str,
        _cancel: &CancellationToken,
    ) -> Result<Option<OwnerProfile>> {
        if self.fail {
            return Err(crate::error::SearchError::resolver(
                "scripted resolver failure",
            ));
        }
        Ok(self.profiles.lock().unwrap().get(company).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::jobs::{MockJobRunner, OrganicResult, WebSearchPage};

    #[tokio::test]
    async fn serp_resolver_parses_profile_titles() {
        let jobs = Arc::new(MockJobRunner::new().with_web_pages(vec![WebSearchPage {
            query: "q".into(),
            organic_results: vec![OrganicResult {
                title: "Jane Doe - CEO - Acme Clinics | LinkedIn".into(),
                url: "https://linkedin.com/in/janedoe".into(),
                description: None,
            }],
        }]));
        let resolver = SerpOwnerResolver::new(jobs);

        let profile = resolver
            .discover_owner("Acme Clinics", "acme.com", "health", "Madrid", &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.name.as_deref(), Some("Jane Doe"));
        assert_eq!(profile.role.as_deref(), Some("CEO"));
        assert!(profile.linkedin.is_some());
    }

    #[tokio::test]
    async fn serp_resolver_returns_none_without_person_titles() {
        let jobs = Arc::new(MockJobRunner::new().with_web_pages(vec![WebSearchPage {
            query: "q".into(),
            organic_results: vec![OrganicResult {
                title: "Acme Clinics homepage".into(),
                url: "https://acme.com".into(),
                description: None,
            }],
        }]));
        let resolver = SerpOwnerResolver::new(jobs);

        let profile = resolver
            .discover_owner("Acme Clinics", "acme.com", "health", "Madrid", &CancellationToken::new())
            .await
            .unwrap();
        assert!(profile.is_none());
    }
}
