//! Knowledge domain types: version records and the persistence slot trait.
//!
//! The knowledge corpus is a single living Markdown document supplied as the
//! remote model's system instruction. Every successful ingestion leaves one
//! immutable `KnowledgeVersion` behind as its provenance record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

/// An immutable log entry describing one ingestion event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeVersion {
    /// Time-ordered unique id (UUID v7)
    pub id: String,

    /// When the knowledge was learned
    pub timestamp: DateTime<Utc>,

    /// Name of the document the knowledge came from
    pub source_name: String,

    /// Short natural-language summary of what was learned
    pub summary: String,
}

impl KnowledgeVersion {
    pub fn new(source_name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            timestamp: Utc::now(),
            source_name: source_name.into(),
            summary: summary.into(),
        }
    }
}

/// The named persistence slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The caller's API credential.
    Credential,
    /// The knowledge corpus text.
    Corpus,
    /// The version history, serialized as a JSON array, newest first.
    VersionHistory,
}

impl Slot {
    pub fn name(self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::Corpus => "knowledge_base",
            Self::VersionHistory => "knowledge_versions",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Last-write-wins key/value persistence for the three slots.
///
/// Implementations: file-backed (one file per slot), in-memory (for testing).
#[async_trait]
pub trait KnowledgeStorage: Send + Sync {
    /// The backend name (e.g., "file", "memory").
    fn name(&self) -> &str;

    /// Read a slot. `Ok(None)` when the slot has never been written.
    async fn read_slot(&self, slot: Slot) -> Result<Option<String>, StorageError>;

    /// Overwrite a slot.
    async fn write_slot(&self, slot: Slot, value: &str) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ids_are_unique_and_time_ordered() {
        let first = KnowledgeVersion::new("a.pdf", "first");
        let second = KnowledgeVersion::new("b.pdf", "second");
        assert_ne!(first.id, second.id);
        assert!(second.id > first.id);
        assert!(second.timestamp >= first.timestamp);
    }

    #[test]
    fn version_serialization_shape() {
        let version = KnowledgeVersion::new("lighting.pdf", "Rembrandt and split lighting");
        let json = serde_json::to_value(&version).unwrap();
        assert_eq!(json["source_name"], "lighting.pdf");
        assert_eq!(json["summary"], "Rembrandt and split lighting");
        assert!(json["id"].is_string());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn slot_names_are_distinct() {
        assert_eq!(Slot::Credential.name(), "credential");
        assert_ne!(Slot::Corpus.name(), Slot::VersionHistory.name());
    }
}
