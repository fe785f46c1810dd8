//! Collaborator traits at the pipeline's seams.

pub mod analyst;
pub mod history;
pub mod jobs;
pub mod resolver;

pub use analyst::{AnalysisResponse, Analyst, InterpretedQuery, MockAnalyst, DEFAULT_TARGET_ROLES};
pub use history::{LeadHistory, MemoryHistory};
pub use jobs::{
    ContactPage, JobRunner, MockJobRunner, OrganicResult, PlaceResult, WebSearchPage,
};
pub use resolver::{MockOwnerResolver, OwnerProfile, OwnerResolver, SerpOwnerResolver};
