//! File-based slot storage: one plain file per slot.
//!
//! Storage location: `~/.promptmaster/`
//! - `credential`: the API key
//! - `knowledge_base.md`: the knowledge corpus
//! - `knowledge_versions.json`: version history, a JSON array, newest first
//!
//! Files are human-inspectable and editable. Each write goes to a sibling
//! temp file that is then renamed over the slot file, so a crash never
//! leaves a half-written slot behind.

use async_trait::async_trait;
use promptmaster_core::error::StorageError;
use promptmaster_core::knowledge::{KnowledgeStorage, Slot};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A directory of slot files.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default location: `~/.promptmaster/`
    pub fn default_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".promptmaster")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file backing a slot.
    pub fn slot_path(&self, slot: Slot) -> PathBuf {
        let file = match slot {
            Slot::Credential => "credential",
            Slot::Corpus => "knowledge_base.md",
            Slot::VersionHistory => "knowledge_versions.json",
        };
        self.dir.join(file)
    }
}

#[async_trait]
impl KnowledgeStorage for FileStorage {
    fn name(&self) -> &str {
        "file"
    }

    async fn read_slot(&self, slot: Slot) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(slot);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read {
                slot: slot.name().into(),
                reason: format!("{}: {e}", path.display()),
            }),
        }
    }

    async fn write_slot(&self, slot: Slot, value: &str) -> Result<(), StorageError> {
        let write_err = |reason: String| StorageError::Write {
            slot: slot.name().into(),
            reason,
        };

        std::fs::create_dir_all(&self.dir)
            .map_err(|e| write_err(format!("Failed to create data directory: {e}")))?;

        let path = self.slot_path(slot);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value).map_err(|e| write_err(format!("{}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &path).map_err(|e| write_err(format!("{}: {e}", path.display())))?;

        debug!(slot = %slot, path = %path.display(), bytes = value.len(), "Slot written");
        Ok(())
    }
}
