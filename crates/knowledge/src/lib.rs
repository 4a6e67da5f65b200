//! Knowledge store and slot storage backends for PromptMaster.

pub mod file_backend;
pub mod in_memory;
pub mod store;

pub use file_backend::FileStorage;
pub use in_memory::InMemoryStorage;
pub use store::{DEFAULT_CORPUS, KnowledgeSnapshot, KnowledgeStore, LEARNED_SECTION_HEADING};
