//! Discovery orchestrator: the fetch → dedup → enrich → analyze attempt loop.
//!
//! One call to [`SearchService::discover`] runs attempts until the target is
//! met, the source is exhausted, the attempt budget runs out, or the run is
//! cancelled. Each attempt over-fetches relative to the current deficit
//! because raw-candidate-to-qualified-lead yield is low; an accumulating
//! scan tracker widens the net on every retry instead of re-querying the
//! same shallow pool.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::channels::channel_impl;
use crate::dedup::{normalize_company, normalize_domain, DedupIndex, Fingerprint};
use crate::enrich::Enricher;
use crate::progress::Progress;
use crate::traits::analyst::{Analyst, InterpretedQuery};
use crate::traits::jobs::JobRunner;
use crate::traits::resolver::OwnerResolver;
use crate::types::{Candidate, Lead, LeadStatus, SearchPolicy, SearchRequest};

/// What one `discover` call produced, with the counters the buffer engine
/// folds into run metrics.
#[derive(Debug, Default)]
pub struct AttemptOutcome {
    /// Ready leads first, then leftover material at lower completeness.
    pub leads: Vec<Lead>,
    pub candidates_seen: usize,
    pub duplicates_rejected: usize,
    pub attempts_used: u32,
    /// The channel stopped yielding new candidates.
    pub exhausted: bool,
}

/// Runs the per-attempt discovery loop for one channel.
pub struct SearchService {
    jobs: Arc<dyn JobRunner>,
    analyst: Option<Arc<dyn Analyst>>,
    resolver: Option<Arc<dyn OwnerResolver>>,
    policy: SearchPolicy,
}

impl SearchService {
    pub fn new(jobs: Arc<dyn JobRunner>) -> Self {
        Self {
            jobs,
            analyst: None,
            resolver: None,
            policy: SearchPolicy::default(),
        }
    }

    pub fn with_analyst(mut self, analyst: Arc<dyn Analyst>) -> Self {
        self.analyst = Some(analyst);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn OwnerResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_policy(mut self, policy: SearchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &SearchPolicy {
        &self.policy
    }

    /// Run the attempt loop until `target` leads are ready or a terminal
    /// condition is reached. Reads the shared dedup index; never mutates it.
    pub async fn discover(
        &self,
        request: &SearchRequest,
        target: usize,
        interpreted: &InterpretedQuery,
        dedup: &DedupIndex,
        cancel: &CancellationToken,
        progress: &Progress,
    ) -> AttemptOutcome {
        let channel = channel_impl(request.channel);
        let enricher = Enricher::new(
            Arc::clone(&self.jobs),
            self.analyst.clone(),
            self.resolver.clone(),
            self.policy.clone(),
        );

        let mut outcome = AttemptOutcome::default();
        let mut ready: Vec<Lead> = Vec::new();
        let mut extras: Vec<Lead> = Vec::new();
        // Fingerprints of candidates taken in earlier attempts of this call;
        // the engine's index only learns about leads it has accepted.
        let mut taken: HashSet<String> = HashSet::new();
        let mut scanned: usize = 0;

        progress.log(format!(
            "Goal: {target} qualified leads via {}",
            channel.label()
        ));

        for attempt in 1..=self.policy.max_attempts {
            if cancel.is_cancelled() {
                break;
            }
            let needed = target.saturating_sub(ready.len());
            if needed == 0 {
                break;
            }
            outcome.attempts_used = attempt;

            let fetch_amount = needed * self.policy.overfetch_factor + scanned;
            progress.log(format!(
                "[attempt {attempt}] Fetching {fetch_amount} candidates to cover a deficit of {needed}"
            ));

            let fetched = match channel
                .fetch_candidates(
                    self.jobs.as_ref(),
                    interpreted,
                    request.filters.as_ref(),
                    fetch_amount,
                    cancel,
                )
                .await
            {
                Ok(fetched) => fetched,
                Err(err) => {
                    // A failed or stuck job costs the attempt, not the run.
                    progress.log(format!("[attempt {attempt}] Job failed: {err}"));
                    tracing::warn!(attempt, error = %err, "Candidate fetch failed");
                    continue;
                }
            };

            scanned += fetched.len();
            outcome.candidates_seen += fetched.len();
            progress.log(format!(
                "[attempt {attempt}] Source returned {} candidates",
                fetched.len()
            ));

            let mut novel: Vec<Candidate> = Vec::new();
            for candidate in &fetched {
                if self.is_known(candidate, dedup, &taken) {
                    outcome.duplicates_rejected += 1;
                } else {
                    novel.push(candidate.clone());
                }
            }

            if novel.is_empty() {
                if attempt == self.policy.max_attempts
                    && self.policy.allow_duplicates_on_final_attempt
                    && !fetched.is_empty()
                {
                    progress.log(format!(
                        "[attempt {attempt}] Duplicate-tolerant final attempt: taking {} unfiltered candidates",
                        needed.min(fetched.len())
                    ));
                    novel = fetched.into_iter().take(needed).collect();
                } else {
                    progress.log(format!(
                        "[attempt {attempt}] No new candidates from this query"
                    ));
                    outcome.exhausted = true;
                    break;
                }
            }

            for candidate in &novel {
                self.mark_taken(candidate, &mut taken);
            }

            // A website is the enrichment anchor; hits without one stay raw.
            let (with_web, webless): (Vec<Candidate>, Vec<Candidate>) =
                novel.into_iter().partition(|c| c.website.is_some());
            progress.log(format!(
                "[attempt {attempt}] {} candidates carry a website, enriching",
                with_web.len()
            ));
            extras.extend(
                webless
                    .iter()
                    .map(|c| Lead::from_candidate(c, request.channel)),
            );

            let mut leads: Vec<Lead> = with_web
                .iter()
                .map(|c| Lead::from_candidate(c, request.channel))
                .collect();
            enricher
                .enrich_contacts(
                    &mut leads,
                    &interpreted.industry,
                    &interpreted.location,
                    cancel,
                    progress,
                )
                .await;

            // Hard requirement: an email address, even a placeholder, gates
            // the analysis stage.
            let (with_email, without_email): (Vec<Lead>, Vec<Lead>) = leads
                .into_iter()
                .partition(|l| l.decision_maker.has_email());
            progress.log(format!(
                "[attempt {attempt}] {} candidates hold an email address",
                with_email.len()
            ));
            extras.extend(without_email);

            let mut queue = with_email.into_iter();
            let slots = target.saturating_sub(ready.len());
            for _ in 0..slots {
                let Some(mut lead) = queue.next() else {
                    break;
                };
                if cancel.is_cancelled() {
                    extras.push(lead);
                    break;
                }
                progress.log(format!("Researching {}", lead.company_name));
                let research = enricher.research_lead(&lead, cancel).await;
                enricher.synthesize(&mut lead, &research, cancel).await;
                lead.status = LeadStatus::Ready;
                progress.log(format!(
                    "Lead ready: {} ({}/{target})",
                    lead.company_name,
                    ready.len() + 1
                ));
                ready.push(lead);
            }
            // Enriched but unanalyzed leads are still material for the
            // guarantee phase.
            extras.extend(queue);
        }

        if ready.len() < target {
            progress.log(format!(
                "Shortfall: {} of {target} leads after {} attempts",
                ready.len(),
                outcome.attempts_used
            ));
        } else {
            progress.log(format!("Target met: {} leads ready", ready.len()));
        }

        outcome.leads = ready;
        outcome.leads.extend(extras);
        outcome
    }

    fn is_known(
        &self,
        candidate: &Candidate,
        dedup: &DedupIndex,
        taken: &HashSet<String>,
    ) -> bool {
        if dedup.is_duplicate(&Fingerprint::of_candidate(candidate)) {
            return true;
        }
        if let Some(website) = &candidate.website {
            if taken.contains(&normalize_domain(website)) {
                return true;
            }
        }
        let name = normalize_company(&candidate.company_name);
        !name.is_empty() && taken.contains(&name)
    }

    fn mark_taken(&self, candidate: &Candidate, taken: &mut HashSet<String>) {
        if let Some(website) = &candidate.website {
            let domain = normalize_domain(website);
            if !domain.is_empty() {
                taken.insert(domain);
            }
        }
        let name = normalize_company(&candidate.company_name);
        if !name.is_empty() {
            taken.insert(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::jobs::{MockJobRunner, PlaceResult};
    use crate::types::Channel;

    fn place(title: &str, website: &str, email: Option<&str>) -> PlaceResult {
        PlaceResult {
            title: Some(title.to_string()),
            website: Some(website.to_string()),
            email: email.map(str::to_string),
            ..Default::default()
        }
    }

    fn run_request(quota: usize) -> SearchRequest {
        SearchRequest::new("gyms madrid", Channel::Maps, quota)
    }

    #[tokio::test]
    async fn quota_slices_the_analysis_stage() {
        let jobs = MockJobRunner::new().with_place_batch(vec![
            place("A", "a.com", Some("a@a.com")),
            place("B", "b.com", Some("b@b.com")),
            place("C", "c.com", Some("c@c.com")),
            place("D", "d.com", Some("d@d.com")),
        ]);
        let service = SearchService::new(Arc::new(jobs));
        let request = run_request(2);
        let interpreted = InterpretedQuery::fallback("gyms madrid", "Spain");

        let outcome = service
            .discover(
                &request,
                2,
                &interpreted,
                &DedupIndex::new(false),
                &CancellationToken::new(),
                &Progress::disabled(),
            )
            .await;

        let ready: Vec<_> = outcome
            .leads
            .iter()
            .filter(|l| l.status == LeadStatus::Ready)
            .collect();
        assert_eq!(ready.len(), 2);
        // The other two stay behind as lower-completeness material.
        assert_eq!(outcome.leads.len(), 4);
        assert_eq!(outcome.candidates_seen, 4);
        assert_eq!(outcome.attempts_used, 1);
    }

    #[tokio::test]
    async fn failed_job_consumes_the_attempt_not_the_run() {
        let jobs = MockJobRunner::new()
            .with_place_error("actor run r1 stuck after 11 unchanged polls")
            .with_place_batch(vec![place("A", "a.com", Some("a@a.com"))]);
        let service = SearchService::new(Arc::new(jobs));
        let request = run_request(1);
        let interpreted = InterpretedQuery::fallback("gyms madrid", "Spain");

        let outcome = service
            .discover(
                &request,
                1,
                &interpreted,
                &DedupIndex::new(false),
                &CancellationToken::new(),
                &Progress::disabled(),
            )
            .await;

        assert_eq!(outcome.attempts_used, 2);
        assert_eq!(
            outcome
                .leads
                .iter()
                .filter(|l| l.status == LeadStatus::Ready)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn all_duplicates_exhausts_without_desperation_policy() {
        let mut index = DedupIndex::new(false);
        index.insert_key("a.com");
        let jobs = MockJobRunner::new().with_place_batch(vec![place("A", "a.com", None)]);
        let service = SearchService::new(Arc::new(jobs));
        let request = run_request(1);
        let interpreted = InterpretedQuery::fallback("gyms madrid", "Spain");

        let outcome = service
            .discover(
                &request,
                1,
                &interpreted,
                &index,
                &CancellationToken::new(),
                &Progress::disabled(),
            )
            .await;

        assert!(outcome.exhausted);
        assert!(outcome.leads.is_empty());
        assert_eq!(outcome.duplicates_rejected, 1);
    }

    #[tokio::test]
    async fn desperation_policy_accepts_duplicates_on_final_attempt() {
        let mut index = DedupIndex::new(false);
        index.insert_key("a.com");
        let jobs = MockJobRunner::new()
            .with_place_batch(vec![place("A", "a.com", Some("a@a.com"))]);
        let policy = SearchPolicy::default()
            .with_max_attempts(1)
            .allow_duplicates_on_final_attempt(true);
        let service = SearchService::new(Arc::new(jobs)).with_policy(policy);
        let request = run_request(1);
        let interpreted = InterpretedQuery::fallback("gyms madrid", "Spain");

        let outcome = service
            .discover(
                &request,
                1,
                &interpreted,
                &index,
                &CancellationToken::new(),
                &Progress::disabled(),
            )
            .await;

        assert!(!outcome.exhausted);
        assert_eq!(
            outcome
                .leads
                .iter()
                .filter(|l| l.status == LeadStatus::Ready)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn within_call_duplicates_across_attempts_are_screened() {
        // Attempt 1 takes a.com but needs two leads; attempt 2 returns the
        // same company again plus a new one.
        let jobs = MockJobRunner::new()
            .with_place_batch(vec![place("A", "a.com", Some("a@a.com"))])
            .with_place_batch(vec![
                place("A", "a.com", Some("a@a.com")),
                place("B", "b.com", Some("b@b.com")),
            ]);
        let service = SearchService::new(Arc::new(jobs));
        let request = run_request(2);
        let interpreted = InterpretedQuery::fallback("gyms madrid", "Spain");

        let outcome = service
            .discover(
                &request,
                2,
                &interpreted,
                &DedupIndex::new(false),
                &CancellationToken::new(),
                &Progress::disabled(),
            )
            .await;

        let ready: Vec<_> = outcome
            .leads
            .iter()
            .filter(|l| l.status == LeadStatus::Ready)
            .map(|l| l.company_name.as_str())
            .collect();
        assert_eq!(ready, vec!["A", "B"]);
        assert_eq!(outcome.duplicates_rejected, 1);
    }
}
