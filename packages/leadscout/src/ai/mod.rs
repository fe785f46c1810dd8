//! AI oracle implementations.

pub mod openai;

pub use openai::OpenAiAnalyst;
