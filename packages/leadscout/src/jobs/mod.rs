//! Job provider adapters.

pub mod apify;

pub use apify::ApifyJobRunner;
