//! Buffer & guarantee engine: the pipeline's public surface.
//!
//! [`LeadPipeline`] wraps the discovery orchestrator with a four-stage
//! buffer. Incoming leads are classified by data completeness (never by what
//! the orchestrator asserts), and when the orchestrator under-delivers, the
//! guarantee phase promotes leads from lower-quality stages until the quota
//! is met or the material runs out — an explicit preference for returning a
//! lower-confidence lead over returning fewer leads than requested.
//!
//! The engine exclusively owns the buffer state, the dedup index and the
//! metrics for the run's lifetime; the orchestrator only reads the index.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::dedup::{DedupIndex, Fingerprint};
use crate::interpreter::QueryInterpreter;
use crate::orchestrator::SearchService;
use crate::progress::Progress;
use crate::traits::analyst::Analyst;
use crate::traits::history::LeadHistory;
use crate::traits::jobs::JobRunner;
use crate::traits::resolver::OwnerResolver;
use crate::types::{
    BufferStage, BufferedLead, Channel, CompletedRun, Lead, LeadStatus, RunMetrics, RunOrigin,
    RunOutcome, RunReport, SearchPolicy, SearchRequest,
};

/// Four ordered buffers, one per completeness stage.
#[derive(Default)]
struct BufferState {
    raw: Vec<BufferedLead>,
    discovered: Vec<BufferedLead>,
    enriched: Vec<BufferedLead>,
    ready: Vec<BufferedLead>,
}

impl BufferState {
    fn push(&mut self, buffered: BufferedLead) {
        match buffered.stage {
            BufferStage::Raw => self.raw.push(buffered),
            BufferStage::Discovered => self.discovered.push(buffered),
            BufferStage::Enriched => self.enriched.push(buffered),
            BufferStage::Ready => self.ready.push(buffered),
        }
    }
}

/// Derive a lead's buffer stage from its attributes.
fn classify(lead: &Lead) -> BufferStage {
    match lead.status {
        LeadStatus::Ready => BufferStage::Ready,
        LeadStatus::Enriched => BufferStage::Enriched,
        LeadStatus::Scraped => {
            if lead.decision_maker.has_verified_email() {
                BufferStage::Discovered
            } else {
                BufferStage::Raw
            }
        }
    }
}

/// Promote leads from lower stages until the quota is met or everything is
/// drained. Order is fixed: enriched, then discovered, then raw.
fn promote_for_quota(buffers: &mut BufferState, quota: usize, progress: &Progress) {
    if buffers.ready.len() >= quota {
        progress.log(format!(
            "Target met: {} leads ready, no promotion needed",
            buffers.ready.len()
        ));
        return;
    }

    let deficit = quota - buffers.ready.len();
    progress.log(format!("Results guarantee active (deficit: {deficit})"));

    let BufferState {
        raw,
        discovered,
        enriched,
        ready,
    } = buffers;

    for (source, stage_name) in [
        (enriched, "enriched"),
        (discovered, "discovered"),
        (raw, "raw"),
    ] {
        if ready.len() >= quota {
            break;
        }
        let count = (quota - ready.len()).min(source.len());
        if count == 0 {
            continue;
        }
        progress.log(format!("Promoting {count} {stage_name} leads to ready"));
        for _ in 0..count {
            let Some(mut buffered) = source.pop() else {
                break;
            };
            buffered.stage = BufferStage::Ready;
            buffered.lead.status = LeadStatus::Ready;
            ready.push(buffered);
        }
    }

    progress.log(format!(
        "Guarantee result: {}/{quota} leads",
        buffers.ready.len()
    ));
}

/// The lead discovery pipeline.
///
/// One logical run at a time. `run` always returns a report — fatal errors
/// are folded into [`RunOutcome::Failed`] together with whatever partial
/// results exist, so a caller is never left without an answer.
pub struct LeadPipeline {
    jobs: Arc<dyn JobRunner>,
    analyst: Option<Arc<dyn Analyst>>,
    resolver: Option<Arc<dyn OwnerResolver>>,
    history: Arc<dyn LeadHistory>,
    policy: SearchPolicy,
    origin: RunOrigin,
    progress: Mutex<Progress>,
    cancel: Mutex<CancellationToken>,
}

impl LeadPipeline {
    pub fn new(jobs: Arc<dyn JobRunner>, history: Arc<dyn LeadHistory>) -> Self {
        Self {
            jobs,
            analyst: None,
            resolver: None,
            history,
            policy: SearchPolicy::default(),
            origin: RunOrigin::Manual,
            progress: Mutex::new(Progress::disabled()),
            cancel: Mutex::new(CancellationToken::new()),
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

    /// Tag runs recorded to history as scheduler-originated.
    pub fn with_origin(mut self, origin: RunOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Subscribe to the ordered progress stream for subsequent runs.
    pub fn progress(&self) -> UnboundedReceiver<String> {
        let (progress, rx) = Progress::channel();
        *self.progress.lock().unwrap() = progress;
        rx
    }

    /// Stop the current run. Safe to call at any time, idempotent; every
    /// pipeline loop exits at its next checkpoint and the accumulated leads
    /// are returned.
    pub fn stop(&self) {
        self.cancel.lock().unwrap().cancel();
    }

    /// Execute one search run to completion.
    pub async fn run(&self, request: SearchRequest) -> RunReport {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let progress = self.progress.lock().unwrap().clone();
        let cancel = {
            let mut guard = self.cancel.lock().unwrap();
            *guard = CancellationToken::new();
            guard.clone()
        };

        if let Err(err) = request.validate() {
            progress.log(format!("Cannot start run: {err}"));
            let mut metrics = RunMetrics::default();
            metrics.finalize(0, started.elapsed().as_millis() as u64);
            return RunReport {
                run_id,
                leads: Vec::new(),
                metrics,
                outcome: RunOutcome::Failed(err.to_string()),
            };
        }

        progress.log(format!(
            "Starting search with results guarantee: \"{}\" (quota {})",
            request.query, request.quota
        ));

        let mut index = DedupIndex::new(self.policy.strict_dedup);
        self.seed_index(&mut index, &progress).await;

        let interpreter =
            QueryInterpreter::new(self.analyst.clone(), self.policy.default_region.clone());
        let interpreted = interpreter
            .interpret(&request.query, request.channel, &progress)
            .await;

        let mut service =
            SearchService::new(Arc::clone(&self.jobs)).with_policy(self.policy.clone());
        if let Some(analyst) = &self.analyst {
            service = service.with_analyst(Arc::clone(analyst));
        }
        if let Some(resolver) = &self.resolver {
            service = service.with_resolver(Arc::clone(resolver));
        }

        let mut buffers = BufferState::default();
        let mut metrics = RunMetrics::default();
        let mut cancelled = false;

        for iteration in 1..=self.policy.engine_iterations {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if started.elapsed() > self.policy.run_budget {
                progress.log("Run budget exhausted, stopping iterations".to_string());
                break;
            }
            let needed = request.quota.saturating_sub(buffers.ready.len());
            if needed == 0 {
                break;
            }
            progress.log(format!(
                "Iteration {iteration}/{}: {needed} leads outstanding",
                self.policy.engine_iterations
            ));

            let outcome = service
                .discover(&request, needed, &interpreted, &index, &cancel, &progress)
                .await;
            metrics.candidates_seen += outcome.candidates_seen;
            metrics.duplicates_found += outcome.duplicates_rejected;
            metrics.attempts_used += outcome.attempts_used;

            self.ingest(
                outcome.leads,
                iteration,
                request.channel,
                &mut buffers,
                &mut index,
                &mut metrics,
                &progress,
            );

            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if outcome.exhausted {
                progress.log("Source exhausted, no further iterations".to_string());
                break;
            }
            if iteration < self.policy.engine_iterations {
                tokio::select! {
                    _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {}
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                }
            }
        }

        if !cancelled {
            promote_for_quota(&mut buffers, request.quota, &progress);
        }

        let mut leads: Vec<Lead> = buffers.ready.drain(..).map(|b| b.lead).collect();
        leads.truncate(request.quota);
        metrics.finalize(leads.len(), started.elapsed().as_millis() as u64);

        let outcome = if cancelled {
            RunOutcome::Cancelled
        } else if leads.len() >= request.quota {
            RunOutcome::Completed
        } else {
            RunOutcome::ShortDelivery
        };

        progress.log(format!(
            "Run finished: {}/{} leads in {:.1}s ({} candidates seen, {} duplicates, success rate {:.0}%)",
            leads.len(),
            request.quota,
            metrics.elapsed_ms as f64 / 1000.0,
            metrics.candidates_seen,
            metrics.duplicates_found,
            metrics.success_rate * 100.0
        ));

        if !cancelled && !leads.is_empty() {
            let completed = CompletedRun {
                id: run_id,
                query: request.query.clone(),
                channel: request.channel,
                leads: leads.clone(),
                origin: self.origin,
                completed_at: Utc::now(),
            };
            if let Err(err) = self.history.record_run(&completed).await {
                progress.log(format!("Could not record run to history: {err}"));
                tracing::warn!(error = %err, "History append failed");
            }
        }

        RunReport {
            run_id,
            leads,
            metrics,
            outcome,
        }
    }

    async fn seed_index(&self, index: &mut DedupIndex, progress: &Progress) {
        match self.history.prior_leads().await {
            Ok(leads) => {
                for lead in &leads {
                    index.accept(&Fingerprint::of_lead(lead));
                }
                progress.log(format!(
                    "Duplicate shield active: {} identity keys from history",
                    index.len()
                ));
            }
            Err(err) => {
                progress.log(format!("Could not load lead history: {err}"));
                tracing::warn!(error = %err, "History read failed, starting with an empty index");
            }
        }
        match self.history.blacklist().await {
            Ok(keys) => {
                for key in &keys {
                    index.insert_key(key);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Blacklist read failed");
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn ingest(
        &self,
        leads: Vec<Lead>,
        iteration: u32,
        channel: Channel,
        buffers: &mut BufferState,
        index: &mut DedupIndex,
        metrics: &mut RunMetrics,
        progress: &Progress,
    ) {
        for lead in leads {
            // The orchestrator screened by domain and name; the full
            // six-criterion check also catches email and social collisions
            // surfaced by enrichment.
            if index.is_duplicate(&Fingerprint::of_lead(&lead)) {
                // A ready lead flagged here can only come from the
                // duplicate-tolerant final attempt; honor that policy.
                if self.policy.allow_duplicates_on_final_attempt
                    && lead.status == LeadStatus::Ready
                {
                    progress.log(format!(
                        "Accepting duplicate under final-attempt policy: {}",
                        lead.company_name
                    ));
                } else {
                    metrics.duplicates_found += 1;
                    progress.log(format!("Skipping duplicate: {}", lead.company_name));
                    continue;
                }
            }
            index.accept(&Fingerprint::of_lead(&lead));
            let stage = classify(&lead);
            progress.log(format!(
                "Buffered [{}]: {}",
                stage.as_str(),
                lead.company_name
            ));
            buffers.push(BufferedLead {
                lead,
                stage,
                attempt: iteration,
                channel,
            });
        }
    }
}
