//! In-memory slot storage: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use promptmaster_core::error::StorageError;
use promptmaster_core::knowledge::{KnowledgeStorage, Slot};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Slot storage kept in a HashMap. Nothing survives the process.
pub struct InMemoryStorage {
    slots: Arc<RwLock<HashMap<Slot, String>>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    failing_slots: Mutex<HashSet<Slot>>,
    fail_reads: AtomicBool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            failing_slots: Mutex::new(HashSet::new()),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Pre-populate a slot.
    pub fn with_slot(self, slot: Slot, value: impl Into<String>) -> Self {
        // Not yet shared, so the lock is uncontended.
        if let Ok(mut slots) = self.slots.try_write() {
            slots.insert(slot, value.into());
        }
        self
    }

    /// Make every subsequent write fail (simulates a full disk).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make writes to one slot fail while the others keep working.
    pub fn fail_writes_to(&self, slot: Slot) {
        if let Ok(mut slots) = self.failing_slots.lock() {
            slots.insert(slot);
        }
    }

    /// Make every subsequent read fail (simulates an unreadable data dir).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeStorage for InMemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn read_slot(&self, slot: Slot) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Read {
                slot: slot.name().into(),
                reason: "simulated read failure".into(),
            });
        }
        Ok(self.slots.read().await.get(&slot).cloned())
    }

    async fn write_slot(&self, slot: Slot, value: &str) -> Result<(), StorageError> {
        let slot_fails = self
            .failing_slots
            .lock()
            .map(|slots| slots.contains(&slot))
            .unwrap_or(false);
        if slot_fails || self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write {
                slot: slot.name().into(),
                reason: "simulated write failure".into(),
            });
        }
        self.slots.write().await.insert(slot, value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read() {
        let storage = InMemoryStorage::new();
        assert!(storage.read_slot(Slot::Corpus).await.unwrap().is_none());

        storage.write_slot(Slot::Corpus, "# KB").await.unwrap();
        assert_eq!(
            storage.read_slot(Slot::Corpus).await.unwrap().as_deref(),
            Some("# KB")
        );
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test]
    async fn failing_writes_leave_slot_untouched() {
        let storage = InMemoryStorage::new().with_slot(Slot::Credential, "AIza-old");
        storage.set_fail_writes(true);
        assert!(storage.write_slot(Slot::Credential, "AIza-new").await.is_err());
        assert_eq!(
            storage.read_slot(Slot::Credential).await.unwrap().as_deref(),
            Some("AIza-old")
        );
    }

    #[tokio::test]
    async fn single_slot_failure_spares_the_others() {
        let storage = InMemoryStorage::new();
        storage.fail_writes_to(Slot::VersionHistory);
        assert!(storage.write_slot(Slot::VersionHistory, "[]").await.is_err());
        storage.write_slot(Slot::Corpus, "# KB").await.unwrap();
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test]
    async fn failing_reads_report_the_slot() {
        let storage = InMemoryStorage::new().with_slot(Slot::Corpus, "# KB");
        storage.set_fail_reads(true);
        let err = storage.read_slot(Slot::Corpus).await.unwrap_err();
        assert!(err.to_string().contains("knowledge_base"));
    }
}
