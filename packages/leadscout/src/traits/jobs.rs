//! Job runner trait: the remote scraping job provider.
//!
//! The pipeline uses three job types: geographic/category place search,
//! generic contact-page scraping, and indexed-text web search (the latter
//! serves both person-first discovery and deep contextual research). This
//! trait abstracts over the provider so the orchestrator can be tested
//! against scripted responses.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SearchError};

/// A place hit from a geographic/category search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceResult {
    pub title: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    pub phone: Option<String>,
    pub rating: Option<f32>,
    pub reviews_count: Option<u32>,
    pub category: Option<String>,
}

/// Contact data scraped from one page of a website.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactPage {
    pub url: String,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub social_profiles: Vec<String>,
}

/// One result page of an indexed-text web search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebSearchPage {
    pub query: String,
    #[serde(default)]
    pub organic_results: Vec<OrganicResult>,
}

/// A single organic search result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganicResult {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
}

/// Remote job provider.
///
/// Every operation checks `cancel` at its suspension points and returns an
/// empty result set when the run has been stopped; job failures surface as
/// [`SearchError::Job`] and are absorbed at the attempt level by the caller.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Geographic/category candidate search sized to `max_places`.
    async fn search_places(
        &self,
        query: &str,
        max_places: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<PlaceResult>>;

    /// Generic contact-page scrape of the given websites (domains, no scheme).
    async fn scrape_contacts(
        &self,
        websites: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ContactPage>>;

    /// Indexed-text search, one result page per query.
    async fn search_web(
        &self,
        queries: &[String],
        results_per_query: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<WebSearchPage>>;
}

/// Scripted job runner for testing.
///
/// Place-search responses are consumed per call in order; an exhausted
/// script yields empty results (the "source dry" signal). Contact pages are
/// keyed by website substring match, mirroring how real scrape results are
/// mapped back to their candidates.
#[derive(Default)]
pub struct MockJobRunner {
    place_batches: Mutex<VecDeque<std::result::Result<Vec<PlaceResult>, String>>>,
    contacts: Mutex<HashMap<String, ContactPage>>,
    web_pages: Mutex<Vec<WebSearchPage>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockJobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one place-search response.
    pub fn with_place_batch(self, batch: Vec<PlaceResult>) -> Self {
        self.place_batches.lock().unwrap().push_back(Ok(batch));
        self
    }

    /// Queue one failing place-search call.
    pub fn with_place_error(self, message: impl Into<String>) -> Self {
        self.place_batches
            .lock()
            .unwrap()
            .push_back(Err(message.into()));
        self
    }

    /// Register the contact page returned for a website.
    pub fn with_contact(self, website: &str, emails: &[&str], socials: &[&str]) -> Self {
        self.contacts.lock().unwrap().insert(
            website.to_string(),
            ContactPage {
                url: format!("https://{website}/contact"),
                emails: emails.iter().map(|e| e.to_string()).collect(),
                social_profiles: socials.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    /// Set the pages returned for any web search.
    pub fn with_web_pages(self, pages: Vec<WebSearchPage>) -> Self {
        *self.web_pages.lock().unwrap() = pages;
        self
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl JobRunner for MockJobRunner {
    async fn search_places(
        &self,
        query: &str,
        max_places: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<PlaceResult>> {
        self.record(format!("search_places({query}, {max_places})"));
        if cancel.is_cancelled() {
            return Ok(Vec::new());
        }
        match self.place_batches.lock().unwrap().pop_front() {
            Some(Ok(batch)) => Ok(batch),
            Some(Err(message)) => Err(SearchError::job(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn scrape_contacts(
        &self,
        websites: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ContactPage>> {
        self.record(format!("scrape_contacts({})", websites.join(",")));
        if cancel.is_cancelled() {
            return Ok(Vec::new());
        }
        let contacts = self.contacts.lock().unwrap();
        Ok(websites
            .iter()
            .filter_map(|site| contacts.get(site).cloned())
            .collect())
    }

    async fn search_web(
        &self,
        queries: &[String],
        results_per_query: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<WebSearchPage>> {
        self.record(format!(
            "search_web({} queries, {results_per_query})",
            queries.len()
        ));
        if cancel.is_cancelled() {
            return Ok(Vec::new());
        }
        Ok(self.web_pages.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_consumes_place_batches_in_order() {
        let jobs = MockJobRunner::new()
            .with_place_batch(vec![PlaceResult {
                title: Some("First".into()),
                ..Default::default()
            }])
            .with_place_batch(vec![]);
        let cancel = CancellationToken::new();

        let first = jobs.search_places("q", 10, &cancel).await.unwrap();
        assert_eq!(first.len(), 1);
        let second = jobs.search_places("q", 10, &cancel).await.unwrap();
        assert!(second.is_empty());
        // Script exhausted: further calls look like a dry source.
        let third = jobs.search_places("q", 10, &cancel).await.unwrap();
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn mock_surfaces_scripted_errors() {
        let jobs = MockJobRunner::new().with_place_error("actor run stuck");
        let cancel = CancellationToken::new();
        let err = jobs.search_places("q", 10, &cancel).await.unwrap_err();
        assert!(matches!(err, SearchError::Job(_)));
    }

    #[tokio::test]
    async fn cancelled_calls_return_empty() {
        let jobs = MockJobRunner::new().with_place_batch(vec![PlaceResult::default()]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(jobs.search_places("q", 10, &cancel).await.unwrap().is_empty());
    }
}
