//! Quota-guaranteed lead discovery pipeline.
//!
//! Turns a free-text search intent into a bounded, deduplicated stream of
//! enriched lead records, coordinating remote scraping jobs, an optional AI
//! oracle and an optional owner resolver — and guaranteeing, within its
//! effort bounds, that the caller-specified quota comes back.
//!
//! # Architecture
//!
//! - [`LeadPipeline`] (buffer & guarantee engine) is the public surface: it
//!   owns the run's buffers, metrics and dedup index, and promotes
//!   lower-completeness leads when the orchestrator under-delivers.
//! - [`orchestrator::SearchService`] runs the fetch → dedup → enrich →
//!   analyze attempt loop with adaptive over-fetching.
//! - [`channels`] select how raw candidates are discovered (company-first
//!   maps search vs. person-first professional-network X-ray).
//! - [`traits`] define the collaborator seams (job provider, AI oracle,
//!   owner resolver, lead history), each with a scripted mock.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use leadscout::{Channel, LeadPipeline, SearchRequest};
//! use leadscout::jobs::ApifyJobRunner;
//! use leadscout::traits::MemoryHistory;
//!
//! let pipeline = LeadPipeline::new(
//!     Arc::new(ApifyJobRunner::from_env()?),
//!     Arc::new(MemoryHistory::new()),
//! );
//!
//! let mut progress = pipeline.progress();
//! tokio::spawn(async move {
//!     while let Some(line) = progress.recv().await {
//!         println!("{line}");
//!     }
//! });
//!
//! let report = pipeline
//!     .run(SearchRequest::new("physio clinics madrid", Channel::Maps, 5))
//!     .await;
//! println!("{} leads", report.leads.len());
//! ```

pub mod ai;
pub mod buffer;
pub mod channels;
pub mod dedup;
pub mod enrich;
pub mod error;
pub mod interpreter;
pub mod jobs;
pub mod orchestrator;
pub mod progress;
pub mod traits;
pub mod types;

pub use buffer::LeadPipeline;
pub use error::{Result, SearchError};
pub use progress::Progress;
pub use types::{
    Channel, Lead, RunMetrics, RunOrigin, RunOutcome, RunReport, SearchFilters, SearchPolicy,
    SearchRequest,
};
