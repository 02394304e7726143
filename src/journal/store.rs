//! Entry store accessor contract and an in-process implementation.
//!
//! The insight processor only talks to storage through [`EntryStore`]. The
//! PostgreSQL implementation lives in [`super::repository`]; [`MemoryEntryStore`]
//! backs tests and local runs without a database.

use super::models::JournalEntry;
use crate::error::{InsightError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Per-user entry counts by processing state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    pub total: u64,
    pub processed: u64,
    pub failed: u64,
    pub pending: u64,
}

impl StateCounts {
    /// Share of processed entries in percent, rounded to one decimal
    pub fn processing_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let rate = self.processed as f64 / self.total as f64 * 100.0;
        (rate * 10.0).round() / 10.0
    }
}

#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Persist a newly created entry
    async fn insert(&self, entry: &JournalEntry) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<JournalEntry>>;

    /// Up to `limit` entries with both processing flags false, oldest first
    async fn get_unprocessed(&self, limit: usize) -> Result<Vec<JournalEntry>>;

    /// Write the entry's processing-state fields as one unit
    async fn save(&self, entry: &JournalEntry) -> Result<()>;

    /// Write the processing-state fields only if the stored entry is still
    /// pending. Returns whether the write landed.
    async fn save_if_pending(&self, entry: &JournalEntry) -> Result<bool>;

    /// A user's entries dated at or after `since`, newest first
    async fn entries_since(&self, user_id: &str, since: DateTime<Utc>)
        -> Result<Vec<JournalEntry>>;

    async fn state_counts(&self, user_id: &str) -> Result<StateCounts>;
}

/// Insertion-ordered store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    entries: RwLock<Vec<JournalEntry>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn apply_state(target: &mut JournalEntry, source: &JournalEntry) {
        // Only the processing fields travel; content is owned by the creator.
        let id = target.id.clone();
        let user_id = target.user_id.clone();
        let mood = target.mood.clone();
        let text_note = target.text_note.clone();
        let audio_file = target.audio_file.clone();
        let entry_date = target.entry_date;
        let created_at = target.created_at;

        *target = source.clone();
        target.id = id;
        target.user_id = user_id;
        target.mood = mood;
        target.text_note = text_note;
        target.audio_file = audio_file;
        target.entry_date = entry_date;
        target.created_at = created_at;
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn insert(&self, entry: &JournalEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|existing| existing.id == entry.id) {
            return Err(InsightError::Storage(format!(
                "Entry {} already exists",
                entry.id
            )));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<JournalEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|entry| entry.id == id).cloned())
    }

    async fn get_unprocessed(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|entry| entry.is_pending())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn save(&self, entry: &JournalEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        let stored = entries
            .iter_mut()
            .find(|stored| stored.id == entry.id)
            .ok_or_else(|| InsightError::NotFound {
                id: entry.id.clone(),
            })?;
        Self::apply_state(stored, entry);
        Ok(())
    }

    async fn save_if_pending(&self, entry: &JournalEntry) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let stored = entries
            .iter_mut()
            .find(|stored| stored.id == entry.id)
            .ok_or_else(|| InsightError::NotFound {
                id: entry.id.clone(),
            })?;

        if !stored.is_pending() {
            return Ok(false);
        }
        Self::apply_state(stored, entry);
        Ok(true)
    }

    async fn entries_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<JournalEntry>> {
        let entries = self.entries.read().await;
        let mut matching: Vec<JournalEntry> = entries
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.entry_date >= since)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
        Ok(matching)
    }

    async fn state_counts(&self, user_id: &str) -> Result<StateCounts> {
        let entries = self.entries.read().await;
        let mut counts = StateCounts::default();
        for entry in entries.iter().filter(|entry| entry.user_id == user_id) {
            counts.total += 1;
            if entry.ai_processed() {
                counts.processed += 1;
            } else if entry.ai_processing_failed() {
                counts.failed += 1;
            } else {
                counts.pending += 1;
            }
        }
        Ok(counts)
    }
}
