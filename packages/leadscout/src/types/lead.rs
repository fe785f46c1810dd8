//! Leads: the validated, enrichable unit of output.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::candidate::Candidate;
use super::request::Channel;

/// Lifecycle status of a lead.
///
/// Transitions only move forward except under explicit guarantee promotion,
/// where a lower-stage lead is forcibly marked `Ready` to satisfy the quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Scraped,
    Enriched,
    Ready,
}

/// How a decision-maker email was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailSource {
    /// Came with the raw scraping hit.
    Scraped,
    /// Found by the owner/email resolver.
    Resolved,
    /// Pulled from a generic contact-page scrape.
    ContactPage,
    /// Synthesized `contact@<domain>` placeholder.
    Synthesized,
}

/// Decision-maker sub-record of a lead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionMaker {
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub email_source: Option<EmailSource>,
    pub linkedin: Option<String>,
}

impl DecisionMaker {
    pub fn has_email(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// True when the email exists and is not a synthesized placeholder.
    pub fn has_verified_email(&self) -> bool {
        self.has_email() && self.email_source != Some(EmailSource::Synthesized)
    }

    pub fn set_email(&mut self, email: impl Into<String>, source: EmailSource) {
        self.email = Some(email.into());
        self.email_source = Some(source);
    }
}

/// Inferred activity level of a company's ads or social presence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivitySignal {
    Active,
    Inactive,
    #[default]
    Unknown,
}

impl ActivitySignal {
    /// Parse the oracle's free-form value; anything unrecognized is Unknown.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            _ => Self::Unknown,
        }
    }
}

/// AI-generated qualitative analysis of a lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadAnalysis {
    /// Raw signal from the source listing (rating/review line).
    pub summary: String,
    pub executive_summary: String,
    pub bottleneck: String,
    pub psychological_profile: String,
    pub business_moment: String,
    pub sales_angle: String,
    /// Personalized cold-outreach draft.
    pub outreach_message: String,
    pub ad_status: ActivitySignal,
    pub social_status: ActivitySignal,
}

impl LeadAnalysis {
    /// Deterministic analysis used when the AI oracle is unavailable.
    pub fn unavailable(company_name: &str, summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            executive_summary: format!("Company: {company_name}"),
            bottleneck: String::new(),
            psychological_profile: "Analysis unavailable (no API key)".to_string(),
            business_moment: "Unknown".to_string(),
            sales_angle: "Generic".to_string(),
            outreach_message: String::new(),
            ad_status: ActivitySignal::Unknown,
            social_status: ActivitySignal::Unknown,
        }
    }

    /// Placeholder emitted after synthesis retries are exhausted.
    pub fn failed(company_name: &str, summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            executive_summary: company_name.to_string(),
            bottleneck: "N/A".to_string(),
            psychological_profile: "N/A".to_string(),
            business_moment: "N/A".to_string(),
            sales_angle: "N/A".to_string(),
            outreach_message: String::new(),
            ad_status: ActivitySignal::Unknown,
            social_status: ActivitySignal::Unknown,
        }
    }

    /// True when any synthesis output is present beyond the raw summary.
    pub fn is_populated(&self) -> bool {
        !self.executive_summary.is_empty() || !self.bottleneck.is_empty()
    }
}

/// A validated, enrichable business contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub channel: Channel,
    pub company_name: String,
    /// Normalized website (no scheme, no trailing slash).
    pub website: Option<String>,
    pub location: Option<String>,
    pub decision_maker: DecisionMaker,
    pub analysis: LeadAnalysis,
    pub status: LeadStatus,
}

impl Lead {
    /// Build a lead from a raw candidate, keeping whatever contact data the
    /// scraping hit already carried.
    pub fn from_candidate(candidate: &Candidate, channel: Channel) -> Self {
        let mut decision_maker = DecisionMaker {
            name: candidate.person_name.clone(),
            role: candidate.person_role.clone(),
            ..Default::default()
        };
        if let Some(email) = candidate.emails.iter().find(|e| !e.is_empty()) {
            decision_maker.set_email(email.clone(), EmailSource::Scraped);
        }
        decision_maker.linkedin = candidate
            .social_profiles
            .iter()
            .find(|url| url.to_lowercase().contains("linkedin.com"))
            .cloned();

        Self {
            id: Uuid::new_v4(),
            channel,
            company_name: candidate.company_name.clone(),
            website: candidate.website.clone(),
            location: candidate.address.clone(),
            decision_maker,
            analysis: LeadAnalysis {
                summary: candidate.review_summary(),
                ..Default::default()
            },
            status: LeadStatus::Scraped,
        }
    }

    /// Domain part of the website, the anchor for enrichment.
    pub fn domain(&self) -> Option<&str> {
        self.website
            .as_deref()
            .map(|w| w.split('/').next().unwrap_or(w))
            .filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ordering_is_forward() {
        assert!(LeadStatus::Scraped < LeadStatus::Enriched);
        assert!(LeadStatus::Enriched < LeadStatus::Ready);
    }

    #[test]
    fn from_candidate_carries_scraped_email() {
        let candidate = Candidate::new("Acme", Some("https://acme.com"))
            .with_email("info@acme.com");
        let lead = Lead::from_candidate(&candidate, Channel::Maps);
        assert_eq!(lead.decision_maker.email.as_deref(), Some("info@acme.com"));
        assert_eq!(lead.decision_maker.email_source, Some(EmailSource::Scraped));
        assert!(lead.decision_maker.has_verified_email());
        assert_eq!(lead.status, LeadStatus::Scraped);
    }

    #[test]
    fn synthesized_email_is_not_verified() {
        let mut dm = DecisionMaker::default();
        dm.set_email("contact@acme.com", EmailSource::Synthesized);
        assert!(dm.has_email());
        assert!(!dm.has_verified_email());
    }

    #[test]
    fn domain_strips_path() {
        let candidate = Candidate::new("Acme", Some("https://acme.com/contact"));
        let lead = Lead::from_candidate(&candidate, Channel::Maps);
        assert_eq!(lead.domain(), Some("acme.com"));
    }

    #[test]
    fn activity_signal_parse_is_lenient() {
        assert_eq!(ActivitySignal::parse("Active"), ActivitySignal::Active);
        assert_eq!(ActivitySignal::parse("INACTIVE"), ActivitySignal::Inactive);
        assert_eq!(ActivitySignal::parse("whatever"), ActivitySignal::Unknown);
    }
}
