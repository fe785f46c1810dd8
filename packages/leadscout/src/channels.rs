//! Discovery channels.
//!
//! A channel is how raw candidates are first found. `Maps` discovers
//! companies directly through a geographic/category search;
//! `ProfessionalNetwork` discovers people through an indexed-profile text
//! search and establishes their company second. The variant is selected once
//! at run start and never silently substituted — if the chosen channel yields
//! nothing, the run reports the shortfall.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::traits::analyst::InterpretedQuery;
use crate::traits::jobs::JobRunner;
use crate::types::{normalize_website, Candidate, Channel, SearchFilters};

/// A candidate source tied to one channel.
#[async_trait]
pub trait DiscoveryChannel: Send + Sync {
    fn channel(&self) -> Channel;

    /// Human-readable strategy label for progress output.
    fn label(&self) -> &'static str;

    /// Fetch up to `fetch_amount` raw candidates.
    async fn fetch_candidates(
        &self,
        jobs: &dyn JobRunner,
        interpreted: &InterpretedQuery,
        filters: Option<&SearchFilters>,
        fetch_amount: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>>;
}

/// Select the implementation for a channel. Closed set, resolved once per run.
pub fn channel_impl(channel: Channel) -> Box<dyn DiscoveryChannel> {
    match channel {
        Channel::Maps => Box::new(MapsChannel),
        Channel::ProfessionalNetwork => Box::new(ProfessionalNetworkChannel),
    }
}

fn filter_clause(filters: Option<&SearchFilters>) -> String {
    filters
        .map(|f| f.to_query_clause())
        .filter(|c| !c.is_empty())
        .map(|c| format!(" {c}"))
        .unwrap_or_default()
}

/// Company-first discovery through a geographic/category place search.
pub struct MapsChannel;

#[async_trait]
impl DiscoveryChannel for MapsChannel {
    fn channel(&self) -> Channel {
        Channel::Maps
    }

    fn label(&self) -> &'static str {
        "Maps + contact pages (local search)"
    }

    async fn fetch_candidates(
        &self,
        jobs: &dyn JobRunner,
        interpreted: &InterpretedQuery,
        filters: Option<&SearchFilters>,
        fetch_amount: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>> {
        let query = format!(
            "{} {}{}",
            interpreted.search_query,
            interpreted.location,
            filter_clause(filters)
        );
        let places = jobs.search_places(&query, fetch_amount, cancel).await?;

        Ok(places
            .into_iter()
            .map(|place| {
                let mut candidate = Candidate::new(
                    place.title.unwrap_or_else(|| "Unnamed".to_string()),
                    place.website.as_deref(),
                );
                candidate.address = place.address;
                candidate.phone = place.phone;
                candidate.rating = place.rating;
                candidate.reviews_count = place.reviews_count;
                if let Some(email) = place.email.filter(|e| !e.is_empty()) {
                    candidate.emails.push(email);
                }
                candidate
                    .emails
                    .extend(place.emails.into_iter().filter(|e| !e.is_empty()));
                candidate
            })
            .collect())
    }
}

/// Person-first discovery through an indexed-profile text search.
pub struct ProfessionalNetworkChannel;

#[async_trait]
impl DiscoveryChannel for ProfessionalNetworkChannel {
    fn channel(&self) -> Channel {
        Channel::ProfessionalNetwork
    }

    fn label(&self) -> &'static str {
        "Professional-network X-ray (role search)"
    }

    async fn fetch_candidates(
        &self,
        jobs: &dyn JobRunner,
        interpreted: &InterpretedQuery,
        filters: Option<&SearchFilters>,
        fetch_amount: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>> {
        let roles = interpreted
            .target_roles
            .iter()
            .map(|r| format!("\"{r}\""))
            .collect::<Vec<_>>()
            .join(" OR ");
        let query = format!(
            "site:linkedin.com/in ({roles}) \"{}\" \"{}\"{}",
            interpreted.industry,
            interpreted.location,
            filter_clause(filters)
        );

        let pages = jobs
            .search_web(&[query], fetch_amount.clamp(1, 20), cancel)
            .await?;

        let mut candidates: Vec<Candidate> = Vec::new();
        for page in &pages {
            for result in &page.organic_results {
                let Some(person) = parse_person_title(&result.title) else {
                    continue;
                };
                let Some(company) = person.company else {
                    continue;
                };
                // One candidate per company; a second profile from the same
                // company adds nothing the dedup stage would keep.
                if candidates
                    .iter()
                    .any(|c| c.company_name.eq_ignore_ascii_case(&company))
                {
                    continue;
                }
                let mut candidate = Candidate::new(company, None);
                candidate.person_name = Some(person.name);
                candidate.person_role = person.role;
                candidate.social_profiles.push(result.url.clone());
                candidates.push(candidate);
            }
        }

        if candidates.is_empty() || cancel.is_cancelled() {
            return Ok(candidates);
        }

        // Second pass: establish each company's website, the enrichment
        // anchor that profile hits never carry.
        let site_queries: Vec<String> = candidates
            .iter()
            .map(|c| format!("\"{}\" official website", c.company_name))
            .collect();
        let site_pages = jobs.search_web(&site_queries, 3, cancel).await?;

        for page in &site_pages {
            let Some(candidate) = candidates.iter_mut().find(|c| {
                page.query
                    .to_lowercase()
                    .contains(&c.company_name.to_lowercase())
            }) else {
                continue;
            };
            if candidate.website.is_some() {
                continue;
            }
            if let Some(url) = page
                .organic_results
                .iter()
                .map(|r| r.url.as_str())
                .find(|url| !is_social_url(url))
            {
                let normalized = normalize_website(url);
                if !normalized.is_empty() {
                    candidate.website = Some(normalized);
                }
            }
        }

        Ok(candidates)
    }
}

fn is_social_url(url: &str) -> bool {
    let lowered = url.to_lowercase();
    ["linkedin.com", "facebook.com", "instagram.com", "twitter.com", "x.com"]
        .iter()
        .any(|host| lowered.contains(host))
}

/// A person parsed out of a search-result title.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonTitle {
    pub name: String,
    pub role: Option<String>,
    pub company: Option<String>,
}

/// Parse the conventional `"Name - Role - Company | Site"` title pattern.
///
/// Returns `None` when the title does not look like a person profile (no
/// separator, or a name that is implausibly long).
pub fn parse_person_title(title: &str) -> Option<PersonTitle> {
    let main = title.split(" | ").next().unwrap_or(title);
    let parts: Vec<&str> = main
        .split(" - ")
        .flat_map(|p| p.split(" – "))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if parts.len() < 2 {
        return None;
    }

    let name = parts[0];
    // Person names are short; long first segments are page titles.
    if name.split_whitespace().count() > 4 || name.len() > 60 {
        return None;
    }

    Some(PersonTitle {
        name: name.to_string(),
        role: Some(parts[1].to_string()),
        company: parts.get(2).map(|c| c.to_string()),
    })
}
