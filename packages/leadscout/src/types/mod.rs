//! Core data model for the discovery pipeline.

pub mod candidate;
pub mod lead;
pub mod report;
pub mod request;

pub use candidate::{normalize_website, Candidate};
pub use lead::{ActivitySignal, DecisionMaker, EmailSource, Lead, LeadAnalysis, LeadStatus};
pub use report::{
    BufferStage, BufferedLead, CompletedRun, RunMetrics, RunOrigin, RunOutcome, RunReport,
};
pub use request::{Channel, SearchFilters, SearchPolicy, SearchRequest};
