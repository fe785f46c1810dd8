//! Apify-backed [`JobRunner`].
//!
//! Maps the pipeline's three job types onto their Apify actors and converts
//! wire items into the typed records the channels consume.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use apify_client::{ApifyClient, PollPolicy};

use crate::error::{Result, SearchError};
use crate::traits::jobs::{ContactPage, JobRunner, OrganicResult, PlaceResult, WebSearchPage};

/// Actor ID for the Google Maps place scraper.
const MAPS_SCRAPER: &str = "nwua9Gu5YrADL7ZDj";

/// Actor ID for the generic contact-page scraper.
const CONTACT_SCRAPER: &str = "vdrmO1lXCkhbPjE9j";

/// Actor ID for the Google Search scraper (person-first discovery and deep
/// research both ride on it).
const SEARCH_SCRAPER: &str = "nFJndFXA5zjCTuudP";

pub struct ApifyJobRunner {
    client: ApifyClient,
    policy: PollPolicy,
}

impl ApifyJobRunner {
    pub fn new(client: ApifyClient) -> Self {
        Self {
            client,
            policy: PollPolicy::default(),
        }
    }

    /// Create from the `APIFY_TOKEN` environment variable.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("APIFY_TOKEN")
            .map_err(|_| SearchError::Config("APIFY_TOKEN not set".into()))?;
        Ok(Self::new(ApifyClient::new(token)))
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl JobRunner for ApifyJobRunner {
    async fn search_places(
        &self,
        query: &str,
        max_places: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<PlaceResult>> {
        let input = json!({
            "searchStringsArray": [query],
            "maxCrawledPlacesPerSearch": max_places,
            "includeWebsiteEmail": true,
            "scrapeContacts": true,
            "skipClosedPlaces": true,
        });

        let items: Vec<MapsItem> = self
            .client
            .run_to_completion(MAPS_SCRAPER, &input, &self.policy, cancel)
            .await
            .map_err(|e| SearchError::Job(Box::new(e)))?;

        Ok(items.into_iter().map(PlaceResult::from).collect())
    }

    async fn scrape_contacts(
        &self,
        websites: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ContactPage>> {
        let start_urls: Vec<serde_json::Value> = websites
            .iter()
            .map(|site| json!({ "url": format!("https://{site}") }))
            .collect();
        let input = json!({
            "startUrls": start_urls,
            "maxRequestsPerWebsite": 2,
            "sameDomainOnly": true,
        });

        let items: Vec<ContactItem> = self
            .client
            .run_to_completion(CONTACT_SCRAPER, &input, &self.policy, cancel)
            .await
            .map_err(|e| SearchError::Job(Box::new(e)))?;

        Ok(items.into_iter().map(ContactPage::from).collect())
    }

    async fn search_web(
        &self,
        queries: &[String],
        results_per_query: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<WebSearchPage>> {
        let input = json!({
            "queries": queries.join("\n"),
            "maxPagesPerQuery": 1,
            "resultsPerPage": results_per_query,
        });

        let items: Vec<SearchItem> = self
            .client
            .run_to_completion(SEARCH_SCRAPER, &input, &self.policy, cancel)
            .await
            .map_err(|e| SearchError::Job(Box::new(e)))?;

        Ok(items.into_iter().map(WebSearchPage::from).collect())
    }
}

/// One place item from the maps scraper dataset.
#[derive(Debug, Deserialize)]
struct MapsItem {
    title: Option<String>,
    website: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    #[serde(default)]
    emails: Vec<String>,
    #[serde(rename = "totalScore")]
    total_score: Option<f32>,
    #[serde(rename = "reviewsCount")]
    reviews_count: Option<u32>,
    #[serde(rename = "categoryName")]
    category: Option<String>,
}

impl From<MapsItem> for PlaceResult {
    fn from(item: MapsItem) -> Self {
        PlaceResult {
            title: item.title,
            website: item.website,
            address: item.address,
            email: item.email,
            emails: item.emails,
            phone: item.phone,
            rating: item.total_score,
            reviews_count: item.reviews_count,
            category: item.category,
        }
    }
}

/// One page item from the contact scraper dataset.
#[derive(Debug, Deserialize)]
struct ContactItem {
    #[serde(default)]
    url: String,
    #[serde(default)]
    emails: Vec<String>,
    #[serde(rename = "linkedIns", default)]
    linkedins: Vec<String>,
    #[serde(default)]
    facebooks: Vec<String>,
    #[serde(default)]
    instagrams: Vec<String>,
    #[serde(default)]
    twitters: Vec<String>,
}

impl From<ContactItem> for ContactPage {
    fn from(item: ContactItem) -> Self {
        let mut social_profiles = item.linkedins;
        social_profiles.extend(item.facebooks);
        social_profiles.extend(item.instagrams);
        social_profiles.extend(item.twitters);
        ContactPage {
            url: item.url,
            emails: item.emails,
            social_profiles,
        }
    }
}

/// One result page from the search scraper dataset.
#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(rename = "searchQuery")]
    search_query: Option<SearchQueryMeta>,
    #[serde(rename = "organicResults", default)]
    organic_results: Vec<OrganicItem>,
}

#[derive(Debug, Deserialize)]
struct SearchQueryMeta {
    term: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    description: Option<String>,
}

impl From<SearchItem> for WebSearchPage {
    fn from(item: SearchItem) -> Self {
        WebSearchPage {
            query: item
                .search_query
                .and_then(|q| q.term)
                .unwrap_or_default(),
            organic_results: item
                .organic_results
                .into_iter()
                .map(|r| OrganicResult {
                    title: r.title,
                    url: r.url,
                    description: r.description,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_item_maps_into_place_result() {
        let item: MapsItem = serde_json::from_str(
            r#"{
                "title": "Acme Gym",
                "website": "https://acmegym.com",
                "address": "Calle Mayor 1",
                "totalScore": 4.4,
                "reviewsCount": 97,
                "categoryName": "Gym",
                "emails": ["info@acmegym.com"]
            }"#,
        )
        .unwrap();
        let place = PlaceResult::from(item);
        assert_eq!(place.title.as_deref(), Some("Acme Gym"));
        assert_eq!(place.rating, Some(4.4));
        assert_eq!(place.emails, vec!["info@acmegym.com".to_string()]);
    }

    #[test]
    fn contact_item_merges_social_profiles() {
        let item: ContactItem = serde_json::from_str(
            r#"{
                "url": "https://acme.com/contact",
                "emails": ["hello@acme.com"],
                "linkedIns": ["https://linkedin.com/company/acme"],
                "instagrams": ["https://instagram.com/acme"]
            }"#,
        )
        .unwrap();
        let page = ContactPage::from(item);
        assert_eq!(page.social_profiles.len(), 2);
        assert!(page.social_profiles[0].contains("linkedin.com"));
    }

    #[test]
    fn search_item_keeps_query_term() {
        let item: SearchItem = serde_json::from_str(
            r#"{
                "searchQuery": { "term": "\"Acme\" official website" },
                "organicResults": [
                    { "title": "Acme", "url": "https://acme.com", "description": "Acme site" }
                ]
            }"#,
        )
        .unwrap();
        let page = WebSearchPage::from(item);
        assert_eq!(page.query, "\"Acme\" official website");
        assert_eq!(page.organic_results.len(), 1);
    }
}
