//! Entry store wrapper that injects storage failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mood_insights::journal::{EntryStore, MemoryEntryStore, StateCounts};
use mood_insights::{InsightError, JournalEntry, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryEntryStore,
    /// Number of upcoming `get_unprocessed` calls that fail
    fetch_failures: AtomicUsize,
    fetch_calls: AtomicUsize,
    /// Entry ids whose writes always fail
    broken_ids: Mutex<HashSet<String>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_fetches(&self, count: usize) {
        self.fetch_failures.store(count, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn break_writes_for(&self, entry_id: &str) {
        self.broken_ids.lock().unwrap().insert(entry_id.to_string());
    }

    fn check_write(&self, entry: &JournalEntry) -> Result<()> {
        if self.broken_ids.lock().unwrap().contains(&entry.id) {
            return Err(InsightError::Storage(format!("write rejected for {}", entry.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl EntryStore for FaultyStore {
    async fn insert(&self, entry: &JournalEntry) -> Result<()> {
        self.inner.insert(entry).await
    }

    async fn get(&self, id: &str) -> Result<Option<JournalEntry>> {
        self.inner.get(id).await
    }

    async fn get_unprocessed(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .fetch_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(InsightError::Storage("connection reset".to_string()));
        }
        self.inner.get_unprocessed(limit).await
    }

    async fn save(&self, entry: &JournalEntry) -> Result<()> {
        self.check_write(entry)?;
        self.inner.save(entry).await
    }

    async fn save_if_pending(&self, entry: &JournalEntry) -> Result<bool> {
        self.check_write(entry)?;
        self.inner.save_if_pending(entry).await
    }

    async fn entries_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<JournalEntry>> {
        self.inner.entries_since(user_id, since).await
    }

    async fn state_counts(&self, user_id: &str) -> Result<StateCounts> {
        self.inner.state_counts(user_id).await
    }
}
