//! Raw candidates, pre-validation.

use serde::{Deserialize, Serialize};

/// A raw hit from a scraping job, before deduplication and enrichment.
///
/// The website, when present, is stored without scheme or trailing slash;
/// further normalization (dropping `www.` and the path) is the dedup
/// validator's concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    pub company_name: String,
    pub website: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    pub phone: Option<String>,
    /// Social profile URLs discovered with the hit.
    #[serde(default)]
    pub social_profiles: Vec<String>,
    /// Person fields, populated by person-first channels.
    pub person_name: Option<String>,
    pub person_role: Option<String>,
    /// Rating metadata from map listings.
    pub rating: Option<f32>,
    pub reviews_count: Option<u32>,
}

impl Candidate {
    /// Create a candidate for a company, normalizing the website.
    pub fn new(company_name: impl Into<String>, website: Option<&str>) -> Self {
        Self {
            company_name: company_name.into(),
            website: website.map(normalize_website).filter(|w| !w.is_empty()),
            ..Default::default()
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.push(email.into());
        self
    }

    /// One-line summary of the listing's review signal, carried into the
    /// lead's analysis context.
    pub fn review_summary(&self) -> String {
        let rating = self
            .rating
            .map(|r| format!("{r:.1}"))
            .unwrap_or_else(|| "?".to_string());
        format!("{rating}★ ({} reviews)", self.reviews_count.unwrap_or(0))
    }
}

/// Strip the scheme and trailing slash from a website URL.
pub fn normalize_website(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn website_loses_scheme_and_trailing_slash() {
        assert_eq!(normalize_website("https://acme.com/"), "acme.com");
        assert_eq!(normalize_website("http://www.acme.com"), "www.acme.com");
        assert_eq!(normalize_website("acme.com/contact/"), "acme.com/contact");
    }

    #[test]
    fn candidate_new_normalizes_and_drops_empty_website() {
        let candidate = Candidate::new("Acme", Some("https://acme.com/"));
        assert_eq!(candidate.website.as_deref(), Some("acme.com"));

        let none = Candidate::new("Acme", Some(""));
        assert!(none.website.is_none());
    }

    #[test]
    fn review_summary_handles_missing_rating() {
        let candidate = Candidate::new("Acme", None);
        assert_eq!(candidate.review_summary(), "?★ (0 reviews)");

        let rated = Candidate {
            rating: Some(4.5),
            reviews_count: Some(120),
            ..Candidate::new("Acme", None)
        };
        assert_eq!(rated.review_summary(), "4.5★ (120 reviews)");
    }
}
