//! Remote model provider implementations for PromptMaster.
//!
//! All providers implement the `promptmaster_core::Provider` trait.

pub mod gemini;

pub use gemini::GeminiProvider;
