//! The knowledge store: sole owner of the corpus and its version history.
//!
//! Corpus and history live behind one lock, so a reader always sees both
//! before an append or both after it. Every mutation is saved before the
//! lock is released; a failed save is logged and the in-memory state is
//! kept (log-and-continue), with the failure exposed through
//! [`KnowledgeStore::last_persist_failed`].
//!
//! An append writes history before corpus and only writes the corpus once
//! history is on disk, so a learned section is never persisted without its
//! version record.

use promptmaster_core::error::StorageError;
use promptmaster_core::knowledge::{KnowledgeStorage, KnowledgeVersion, Slot};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// The fixed default corpus, restored by [`KnowledgeStore::reset`].
pub const DEFAULT_CORPUS: &str = include_str!("default_corpus.md");

/// Heading that opens every learned section appended to the corpus.
pub const LEARNED_SECTION_HEADING: &str = "## [NEW] LEARNED KNOWLEDGE";

/// A consistent view of corpus and history taken under one lock.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeSnapshot {
    pub corpus: String,
    /// Newest first.
    pub history: Vec<KnowledgeVersion>,
}

/// The persisted knowledge corpus plus its provenance log.
pub struct KnowledgeStore {
    storage: Arc<dyn KnowledgeStorage>,
    state: RwLock<KnowledgeSnapshot>,
    persist_failed: AtomicBool,
}

impl KnowledgeStore {
    /// Load corpus and history from storage.
    ///
    /// Never fails: a missing or blank corpus falls back to the default, and
    /// a missing, unreadable or corrupt history degrades to an empty one.
    pub async fn load(storage: Arc<dyn KnowledgeStorage>) -> Self {
        let corpus = match storage.read_slot(Slot::Corpus).await {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => DEFAULT_CORPUS.to_string(),
            Err(e) => {
                warn!(error = %e, "Failed to read knowledge corpus, using default");
                DEFAULT_CORPUS.to_string()
            }
        };

        let history = match storage.read_slot(Slot::VersionHistory).await {
            Ok(Some(json)) => match serde_json::from_str::<Vec<KnowledgeVersion>>(&json) {
                Ok(history) => history,
                Err(e) => {
                    warn!(error = %e, "Corrupt knowledge version history, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read knowledge version history, starting empty");
                Vec::new()
            }
        };

        debug!(
            backend = storage.name(),
            corpus_bytes = corpus.len(),
            versions = history.len(),
            "Knowledge store loaded"
        );

        Self {
            storage,
            state: RwLock::new(KnowledgeSnapshot { corpus, history }),
            persist_failed: AtomicBool::new(false),
        }
    }

    /// The current corpus text.
    pub async fn corpus(&self) -> String {
        self.state.read().await.corpus.clone()
    }

    /// Version history, newest first.
    pub async fn version_history(&self) -> Vec<KnowledgeVersion> {
        self.state.read().await.history.clone()
    }

    /// Corpus and history read together.
    pub async fn snapshot(&self) -> KnowledgeSnapshot {
        self.state.read().await.clone()
    }

    /// Replace the whole corpus with caller-supplied text.
    ///
    /// Blank text restores the default so the corpus is never empty.
    pub async fn replace_corpus(&self, text: impl Into<String>) {
        let text = text.into();
        let mut state = self.state.write().await;
        state.corpus = if text.trim().is_empty() {
            DEFAULT_CORPUS.to_string()
        } else {
            text
        };
        let result = self.write_corpus(&state.corpus).await;
        self.record_save(result);
    }

    /// Append a learned section and record its provenance, as one unit.
    ///
    /// The corpus section and the new first history entry become visible to
    /// readers together. Concurrent callers are serialized by the write lock.
    pub async fn append_knowledge(
        &self,
        knowledge_block: &str,
        provenance_label: &str,
        summary: &str,
    ) -> KnowledgeVersion {
        let mut state = self.state.write().await;
        // Created under the lock so ids follow commit order.
        let version = KnowledgeVersion::new(provenance_label, summary);
        state.corpus.push_str(&format_section(knowledge_block, provenance_label));
        state.history.insert(0, version.clone());
        let result = self.persist_append(&state).await;
        self.record_save(result);
        drop(state);

        info!(
            id = %version.id,
            source = %version.source_name,
            "Knowledge appended"
        );
        version
    }

    /// Restore the default corpus. History is an audit log and is kept.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.corpus = DEFAULT_CORPUS.to_string();
        let result = self.write_corpus(&state.corpus).await;
        self.record_save(result);
        info!("Knowledge corpus reset to default");
    }

    /// Whether any write of the most recent mutation failed.
    pub fn last_persist_failed(&self) -> bool {
        self.persist_failed.load(Ordering::SeqCst)
    }

    /// The persisted credential, if any.
    pub async fn credential(&self) -> Option<String> {
        match self.storage.read_slot(Slot::Credential).await {
            Ok(key) => key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential");
                None
            }
        }
    }

    /// Persist the caller's credential. Unlike knowledge saves, failure is
    /// returned so the caller can ask for the key again.
    pub async fn save_credential(
        &self,
        key: &str,
    ) -> Result<(), StorageError> {
        self.storage.write_slot(Slot::Credential, key.trim()).await
    }

    /// Persist a fresh append: history first, then the corpus.
    ///
    /// If the corpus write fails, the previous history is written back so
    /// disk keeps a consistent pair.
    async fn persist_append(&self, state: &KnowledgeSnapshot) -> Result<(), (Slot, StorageError)> {
        self.write_history(&state.history).await?;
        if let Err(e) = self.write_corpus(&state.corpus).await {
            if let Err(rollback) = self.write_history(&state.history[1..]).await {
                warn!(error = %rollback.1, "Failed to roll back knowledge version history");
            }
            return Err(e);
        }
        Ok(())
    }

    async fn write_corpus(&self, corpus: &str) -> Result<(), (Slot, StorageError)> {
        self.storage
            .write_slot(Slot::Corpus, corpus)
            .await
            .map_err(|e| (Slot::Corpus, e))
    }

    async fn write_history(&self, history: &[KnowledgeVersion]) -> Result<(), (Slot, StorageError)> {
        let json = serde_json::to_string_pretty(history)
            .map_err(|e| (Slot::VersionHistory, StorageError::from(e)))?;
        self.storage
            .write_slot(Slot::VersionHistory, &json)
            .await
            .map_err(|e| (Slot::VersionHistory, e))
    }

    /// Set the failure flag once per mutation.
    fn record_save(&self, result: Result<(), (Slot, StorageError)>) {
        match result {
            Ok(()) => self.persist_failed.store(false, Ordering::SeqCst),
            Err((slot, e)) => {
                warn!(slot = %slot, error = %e, "Failed to persist knowledge, keeping in-memory state");
                self.persist_failed.store(true, Ordering::SeqCst);
            }
        }
    }
}

/// The delimited corpus section for one learned block.
pub fn format_section(knowledge_block: &str, provenance_label: &str) -> String {
    format!(
        "\n\n{LEARNED_SECTION_HEADING} ({provenance_label}):\n{}\n",
        knowledge_block.trim()
    )
}
