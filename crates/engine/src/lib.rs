//! Prompt synthesis and knowledge ingestion for PromptMaster.
//!
//! [`PromptEngine`] ties the pieces together: the [`assembler`] builds one
//! request per synthesis, [`result`] classifies what comes back, and
//! [`ingest`] turns a PDF into a learned corpus section.

pub mod assembler;
pub mod engine;
pub mod ingest;
pub mod prompts;
pub mod result;

#[cfg(test)]
mod test_helpers;

pub use assembler::{GenerationParams, assemble};
pub use engine::{EngineSettings, PromptEngine};
pub use ingest::{IngestOutcome, IngestParams, IngestionReport};
pub use result::{GeneratedPrompt, classify};
