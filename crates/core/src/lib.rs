//! # PromptMaster Core
//!
//! Domain types, traits, and error definitions for the PromptMaster prompt
//! synthesis engine. This crate has **no I/O of its own**; it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The remote model and the persistence layer are traits here; their
//! implementations live in their respective crates. Static catalogs (tags,
//! target-model profiles) are plain tables so that adding an entry is a data
//! change rather than a logic change.

pub mod catalog;
pub mod error;
pub mod knowledge;
pub mod profile;
pub mod provider;
pub mod state;

// Re-export key types at crate root for ergonomics
pub use catalog::{SelectedTags, Tag};
pub use error::{EngineError, ErrorKind, ProviderError, Result, StorageError};
pub use knowledge::{KnowledgeStorage, KnowledgeVersion, Slot};
pub use profile::{ModelProfile, StructuralForm, TargetModel};
pub use provider::{ContentPart, Provider, ProviderRequest, ProviderResponse, ResponseFormat, Usage};
pub use state::{Document, EngineState, ImageInput, InputMode};
