//! Per-candidate enrichment: contact discovery, deep research, AI synthesis.
//!
//! The chain is strictly degrade-don't-drop: owner resolution first, generic
//! contact-page scraping when that yields nothing, a synthesized
//! `contact@<domain>` placeholder when the policy allows, and a placeholder
//! analysis when synthesis keeps failing. A single candidate's failure never
//! aborts its batch.

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::progress::Progress;
use crate::traits::analyst::{AnalysisResponse, Analyst};
use crate::traits::jobs::JobRunner;
use crate::traits::resolver::OwnerResolver;
use crate::types::{EmailSource, Lead, LeadAnalysis, LeadStatus, SearchPolicy};

/// Runs the enrichment chain for one attempt's candidates.
pub struct Enricher {
    jobs: Arc<dyn JobRunner>,
    analyst: Option<Arc<dyn Analyst>>,
    resolver: Option<Arc<dyn OwnerResolver>>,
    policy: SearchPolicy,
}

impl Enricher {
    pub fn new(
        jobs: Arc<dyn JobRunner>,
        analyst: Option<Arc<dyn Analyst>>,
        resolver: Option<Arc<dyn OwnerResolver>>,
        policy: SearchPolicy,
    ) -> Self {
        Self {
            jobs,
            analyst,
            resolver,
            policy,
        }
    }

    /// Contact enrichment for a whole attempt: owner discovery fanned out in
    /// bounded batches, one batched contact scrape for whoever still lacks an
    /// email, then the placeholder policy.
    pub async fn enrich_contacts(
        &self,
        leads: &mut [Lead],
        industry: &str,
        location: &str,
        cancel: &CancellationToken,
        progress: &Progress,
    ) {
        if self.resolver.is_some() {
            for chunk in leads.chunks_mut(self.policy.enrich_batch_size.max(1)) {
                if cancel.is_cancelled() {
                    return;
                }
                join_all(
                    chunk
                        .iter_mut()
                        .map(|lead| self.resolve_owner(lead, industry, location, cancel)),
                )
                .await;
            }
        }

        if cancel.is_cancelled() {
            return;
        }
        self.scrape_missing_contacts(leads, cancel, progress).await;

        if self.policy.placeholder_contact_email {
            for lead in leads.iter_mut() {
                if !lead.decision_maker.has_email() {
                    if let Some(domain) = lead.domain().map(str::to_string) {
                        lead.decision_maker
                            .set_email(format!("contact@{domain}"), EmailSource::Synthesized);
                    }
                }
            }
        }

        for lead in leads.iter_mut() {
            if lead.decision_maker.has_verified_email() && lead.status == LeadStatus::Scraped {
                lead.status = LeadStatus::Enriched;
            }
        }
    }

    async fn resolve_owner(
        &self,
        lead: &mut Lead,
        industry: &str,
        location: &str,
        cancel: &CancellationToken,
    ) {
        let Some(resolver) = &self.resolver else {
            return;
        };
        let Some(website) = lead.website.clone() else {
            return;
        };

        match resolver
            .discover_owner(&lead.company_name, &website, industry, location, cancel)
            .await
        {
            Ok(Some(profile)) => {
                let dm = &mut lead.decision_maker;
                if dm.name.is_none() {
                    dm.name = profile.name;
                }
                if dm.role.is_none() {
                    dm.role = profile.role;
                }
                if dm.linkedin.is_none() {
                    dm.linkedin = profile.linkedin;
                }
                if !dm.has_email() {
                    if let Some(email) = profile.email.filter(|e| !e.is_empty()) {
                        dm.set_email(email, EmailSource::Resolved);
                    }
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(company = %lead.company_name, error = %err, "Owner resolution failed");
            }
        }
    }

    async fn scrape_missing_contacts(
        &self,
        leads: &mut [Lead],
        cancel: &CancellationToken,
        progress: &Progress,
    ) {
        let websites: Vec<String> = leads
            .iter()
            .filter(|l| !l.decision_maker.has_email())
            .filter_map(|l| l.website.clone())
            .collect();
        if websites.is_empty() {
            return;
        }

        progress.log(format!("Scraping contact pages for {} sites", websites.len()));
        let pages = match self.jobs.scrape_contacts(&websites, cancel).await {
            Ok(pages) => pages,
            Err(err) => {
                progress.log(format!("Contact scraper failed: {err}"));
                tracing::warn!(error = %err, "Contact scrape failed, continuing without it");
                return;
            }
        };

        for page in pages {
            let Some(lead) = leads.iter_mut().find(|l| {
                l.website
                    .as_deref()
                    .is_some_and(|site| page.url.contains(site))
            }) else {
                continue;
            };
            if !lead.decision_maker.has_email() {
                if let Some(email) = page.emails.iter().find(|e| is_usable_email(e)) {
                    lead.decision_maker
                        .set_email(email.clone(), EmailSource::ContactPage);
                }
            }
            if lead.decision_maker.linkedin.is_none() {
                lead.decision_maker.linkedin = page
                    .social_profiles
                    .iter()
                    .find(|url| url.to_lowercase().contains("linkedin.com"))
                    .cloned();
            }
        }
    }

    /// Deep contextual research: a handful of targeted searches keyed to the
    /// company, its leadership and its site. Failures yield empty notes.
    pub async fn research_lead(&self, lead: &Lead, cancel: &CancellationToken) -> String {
        let mut queries = Vec::new();
        if !lead.company_name.is_empty() {
            queries.push(format!(
                "\"{}\" mission values products",
                lead.company_name
            ));
            queries.push(format!("\"{}\" CEO OR Founder OR Owner", lead.company_name));
            queries.push(format!("\"{}\" linkedin team", lead.company_name));
        }
        if let Some(website) = &lead.website {
            queries.push(format!("site:{website} \"about\" OR \"team\" OR \"founder\""));
        }
        if queries.is_empty() {
            return String::new();
        }

        let pages = match self.jobs.search_web(&queries, 4, cancel).await {
            Ok(pages) => pages,
            Err(err) => {
                tracing::debug!(company = %lead.company_name, error = %err, "Research search failed");
                return String::new();
            }
        };

        let mut notes = String::new();
        for page in &pages {
            for result in page.organic_results.iter().take(3) {
                notes.push_str(&format!(
                    "\n- {}: {}",
                    result.title,
                    result.description.as_deref().unwrap_or("")
                ));
            }
        }
        notes
    }

    /// AI synthesis with bounded retries and placeholder degradation.
    ///
    /// Leaves the lead's analysis populated in every outcome: the oracle's
    /// answer, the deterministic no-credentials fallback, or the
    /// retries-exhausted placeholder.
    pub async fn synthesize(&self, lead: &mut Lead, research: &str, cancel: &CancellationToken) {
        let summary = lead.analysis.summary.clone();
        let Some(analyst) = &self.analyst else {
            lead.analysis = LeadAnalysis::unavailable(&lead.company_name, &summary);
            return;
        };

        for attempt in 1..=self.policy.synthesis_retries.max(1) {
            if cancel.is_cancelled() {
                break;
            }
            match analyst.analyze_lead(lead, research).await {
                Ok(response) => {
                    apply_analysis(lead, response, &summary);
                    return;
                }
                Err(err) => {
                    tracing::warn!(
                        company = %lead.company_name,
                        attempt,
                        error = %err,
                        "Analysis synthesis failed"
                    );
                    if attempt < self.policy.synthesis_retries {
                        tokio::time::sleep(self.policy.synthesis_backoff).await;
                    }
                }
            }
        }

        lead.analysis = LeadAnalysis::failed(&lead.company_name, &summary);
    }
}

fn apply_analysis(lead: &mut Lead, response: AnalysisResponse, summary: &str) {
    if lead.decision_maker.name.is_none() {
        lead.decision_maker.name = response.detected_owner.filter(|n| !n.is_empty());
    }
    lead.analysis = LeadAnalysis {
        summary: summary.to_string(),
        executive_summary: response.executive_summary,
        bottleneck: response.bottleneck,
        psychological_profile: response.psychological_profile,
        business_moment: response.business_moment,
        sales_angle: response.sales_angle,
        outreach_message: response.outreach_message,
        ad_status: response.ad_status,
        social_status: response.social_status,
    };
}

/// Reject platform-noise addresses the contact scraper routinely dredges up.
pub fn is_usable_email(email: &str) -> bool {
    let lowered = email.to_lowercase();
    lowered.contains('@')
        && !lowered.contains("wix")
        && !lowered.contains("sentry")
        && !lowered.contains("@example")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::analyst::MockAnalyst;
    use crate::traits::jobs::MockJobRunner;
    use crate::traits::resolver::{MockOwnerResolver, OwnerProfile};
    use crate::types::{Candidate, Channel};

    fn lead(company: &str, website: Option<&str>) -> Lead {
        Lead::from_candidate(&Candidate::new(company, website), Channel::Maps)
    }

    fn enricher(
        jobs: MockJobRunner,
        analyst: Option<MockAnalyst>,
        resolver: Option<MockOwnerResolver>,
        policy: SearchPolicy,
    ) -> Enricher {
        Enricher::new(
            Arc::new(jobs),
            analyst.map(|a| Arc::new(a) as Arc<dyn Analyst>),
            resolver.map(|r| Arc::new(r) as Arc<dyn OwnerResolver>),
            policy,
        )
    }

    #[test]
    fn email_noise_filter() {
        assert!(is_usable_email("jane@acme.com"));
        assert!(!is_usable_email("no-reply@wixpress.com"));
        assert!(!is_usable_email("abc123@sentry.io"));
        assert!(!is_usable_email("not-an-email"));
        assert!(!is_usable_email("foo@example.com"));
    }

    #[tokio::test]
    async fn resolver_fills_owner_and_email() {
        let resolver = MockOwnerResolver::new().with_owner(
            "Acme",
            OwnerProfile {
                name: Some("Jane Doe".into()),
                role: Some("CEO".into()),
                email: Some("jane@acme.com".into()),
                confidence: 0.9,
                source: "test".into(),
                ..Default::default()
            },
        );
        let enricher = enricher(
            MockJobRunner::new(),
            None,
            Some(resolver),
            SearchPolicy::default(),
        );
        let mut leads = vec![lead("Acme", Some("acme.com"))];

        enricher
            .enrich_contacts(
                &mut leads,
                "industry",
                "Madrid",
                &CancellationToken::new(),
                &Progress::disabled(),
            )
            .await;

        let dm = &leads[0].decision_maker;
        assert_eq!(dm.name.as_deref(), Some("Jane Doe"));
        assert_eq!(dm.email.as_deref(), Some("jane@acme.com"));
        assert_eq!(dm.email_source, Some(EmailSource::Resolved));
        assert_eq!(leads[0].status, LeadStatus::Enriched);
    }

    #[tokio::test]
    async fn contact_scrape_is_the_fallback() {
        let jobs = MockJobRunner::new().with_contact(
            "acme.com",
            &["no-reply@wixpress.com", "hello@acme.com"],
            &["https://linkedin.com/company/acme"],
        );
        let enricher = enricher(jobs, None, None, SearchPolicy::default());
        let mut leads = vec![lead("Acme", Some("acme.com"))];

        enricher
            .enrich_contacts(
                &mut leads,
                "industry",
                "Madrid",
                &CancellationToken::new(),
                &Progress::disabled(),
            )
            .await;

        let dm = &leads[0].decision_maker;
        assert_eq!(dm.email.as_deref(), Some("hello@acme.com"));
        assert_eq!(dm.email_source, Some(EmailSource::ContactPage));
        assert!(dm.linkedin.as_deref().unwrap().contains("linkedin.com"));
    }

    #[tokio::test]
    async fn placeholder_policy_synthesizes_contact_address() {
        let enricher = enricher(MockJobRunner::new(), None, None, SearchPolicy::default());
        let mut leads = vec![lead("Acme", Some("acme.com/landing"))];

        enricher
            .enrich_contacts(
                &mut leads,
                "industry",
                "Madrid",
                &CancellationToken::new(),
                &Progress::disabled(),
            )
            .await;

        let dm = &leads[0].decision_maker;
        assert_eq!(dm.email.as_deref(), Some("contact@acme.com"));
        assert_eq!(dm.email_source, Some(EmailSource::Synthesized));
        // A placeholder is not a verified email; the lead stays Scraped.
        assert_eq!(leads[0].status, LeadStatus::Scraped);
    }

    #[tokio::test]
    async fn placeholder_policy_can_be_disabled() {
        let policy = SearchPolicy::default().placeholder_contact_email(false);
        let enricher = enricher(MockJobRunner::new(), None, None, policy);
        let mut leads = vec![lead("Acme", Some("acme.com"))];

        enricher
            .enrich_contacts(
                &mut leads,
                "industry",
                "Madrid",
                &CancellationToken::new(),
                &Progress::disabled(),
            )
            .await;

        assert!(!leads[0].decision_maker.has_email());
    }

    #[tokio::test(start_paused = true)]
    async fn synthesis_retries_then_succeeds() {
        let analyst = MockAnalyst::new().with_analyze_failures(2);
        let enricher = enricher(
            MockJobRunner::new(),
            Some(analyst),
            None,
            SearchPolicy::default(),
        );
        let mut target = lead("Acme", Some("acme.com"));

        enricher
            .synthesize(&mut target, "", &CancellationToken::new())
            .await;

        assert!(target.analysis.is_populated());
        assert_eq!(target.analysis.executive_summary, "Acme overview");
    }

    #[tokio::test(start_paused = true)]
    async fn synthesis_degrades_to_placeholder_after_retries() {
        let analyst = MockAnalyst::new().with_analyze_failures(10);
        let enricher = enricher(
            MockJobRunner::new(),
            Some(analyst),
            None,
            SearchPolicy::default(),
        );
        let mut target = lead("Acme", Some("acme.com"));

        enricher
            .synthesize(&mut target, "", &CancellationToken::new())
            .await;

        assert_eq!(target.analysis.bottleneck, "N/A");
        assert_eq!(target.analysis.executive_summary, "Acme");
    }

    #[tokio::test]
    async fn missing_oracle_yields_deterministic_fallback() {
        let enricher = enricher(MockJobRunner::new(), None, None, SearchPolicy::default());
        let mut target = lead("Acme", Some("acme.com"));
        let summary = target.analysis.summary.clone();

        enricher
            .synthesize(&mut target, "", &CancellationToken::new())
            .await;

        assert_eq!(
            target.analysis,
            LeadAnalysis::unavailable("Acme", &summary)
        );
    }
}
