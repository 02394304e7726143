//! Caller-facing insight operations.
//!
//! Each method maps to one request an HTTP or CLI collaborator serves. Errors
//! carry their status through [`InsightError::http_status`].

use super::processor::{InsightProcessor, InsightSource, ProcessOutcome, AI_UNAVAILABLE_MESSAGE};
use crate::error::{InsightError, Result};
use crate::journal::models::{JournalEntry, Mood};
use crate::journal::store::{EntryStore, StateCounts};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Largest id list accepted by [`InsightService::batch_insights`]
pub const MAX_BATCH_IDS: usize = 20;

pub const WEEKLY_WINDOW_DAYS: i64 = 7;

pub const NO_WEEKLY_ENTRIES_MESSAGE: &str = "No mood entries found for the past week. Start logging your daily mood to get personalized insights!";

pub const BATCH_MISSING_ENTRY: &str = "Entry not found or access denied";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryInsight {
    pub entry_id: String,
    pub insight: Option<String>,
    pub processed: bool,
    pub failed: bool,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub source: InsightSource,
}

impl EntryInsight {
    fn new(entry: &JournalEntry, source: InsightSource) -> Self {
        Self {
            entry_id: entry.id.clone(),
            insight: entry.ai_insight().map(str::to_string),
            processed: entry.ai_processed(),
            failed: entry.ai_processing_failed(),
            error_message: entry.ai_error_message().map(str::to_string),
            processed_at: entry.ai_processed_at(),
            source,
        }
    }
}

impl From<ProcessOutcome> for EntryInsight {
    fn from(outcome: ProcessOutcome) -> Self {
        Self::new(&outcome.entry, outcome.source)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub summary: String,
    pub entry_count: usize,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

/// Read-only view of one entry in a batch lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub entry_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<String>,
    pub processed: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    fn found(entry: &JournalEntry) -> Self {
        Self {
            entry_id: entry.id.clone(),
            insight: entry.ai_insight().map(str::to_string),
            processed: entry.ai_processed(),
            failed: entry.ai_processing_failed(),
            processed_at: entry.ai_processed_at(),
            error_message: entry.ai_error_message().map(str::to_string),
            error: None,
        }
    }

    fn missing(entry_id: &str) -> Self {
        Self {
            entry_id: entry_id.to_string(),
            insight: None,
            processed: false,
            failed: false,
            processed_at: None,
            error_message: None,
            error: Some(BATCH_MISSING_ENTRY.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiStatus {
    pub available: bool,
    pub message: String,
    pub total_entries: u64,
    pub processed_entries: u64,
    pub failed_entries: u64,
    pub pending_entries: u64,
    /// Percent of entries processed, one decimal
    pub processing_rate: f64,
}

impl AiStatus {
    fn new(available: bool, message: String, counts: StateCounts) -> Self {
        Self {
            available,
            message,
            total_entries: counts.total,
            processed_entries: counts.processed,
            failed_entries: counts.failed,
            pending_entries: counts.pending,
            processing_rate: counts.processing_rate(),
        }
    }
}

/// Fields accepted when logging a new mood entry
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub mood: Option<Mood>,
    pub text_note: Option<String>,
    pub audio_file: Option<String>,
    pub entry_date: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct InsightService {
    processor: InsightProcessor,
}

impl InsightService {
    pub fn new(processor: InsightProcessor) -> Self {
        Self { processor }
    }

    pub fn processor(&self) -> &InsightProcessor {
        &self.processor
    }

    fn store(&self) -> &Arc<dyn EntryStore> {
        self.processor.store()
    }

    fn generator_available(&self) -> bool {
        self.processor.generator().is_available()
    }

    async fn owned_entry(&self, user_id: &str, entry_id: &str) -> Result<JournalEntry> {
        let entry = self
            .store()
            .get(entry_id)
            .await?
            .ok_or_else(|| InsightError::NotFound {
                id: entry_id.to_string(),
            })?;

        if entry.user_id != user_id {
            return Err(InsightError::AccessDenied {
                id: entry_id.to_string(),
            });
        }
        Ok(entry)
    }

    /// Current insight for an entry, generating it on demand when pending
    #[instrument(skip(self))]
    pub async fn entry_insight(&self, user_id: &str, entry_id: &str) -> Result<EntryInsight> {
        let entry = self.owned_entry(user_id, entry_id).await?;

        if !entry.is_pending() {
            return Ok(EntryInsight::new(&entry, InsightSource::Stored));
        }
        if entry.has_content_for_ai() && !self.generator_available() {
            return Err(InsightError::ServiceUnavailable(
                AI_UNAVAILABLE_MESSAGE.to_string(),
            ));
        }

        let outcome = self.processor.process_one_synchronously(entry_id).await?;
        Ok(outcome.into())
    }

    /// Discard the current outcome and generate once more
    #[instrument(skip(self))]
    pub async fn regenerate(&self, user_id: &str, entry_id: &str) -> Result<EntryInsight> {
        let entry = self.owned_entry(user_id, entry_id).await?;

        if !entry.has_content_for_ai() {
            return Err(InsightError::NoContent {
                id: entry_id.to_string(),
            });
        }
        if !self.generator_available() {
            return Err(InsightError::ServiceUnavailable(
                AI_UNAVAILABLE_MESSAGE.to_string(),
            ));
        }

        info!(entry_id, "Regenerating insight");
        let outcome = self.processor.regenerate(entry_id).await?;
        Ok(outcome.into())
    }

    /// Summary over the user's entries dated within the week before `now`
    #[instrument(skip(self))]
    pub async fn weekly_summary(&self, user_id: &str, now: DateTime<Utc>) -> Result<WeeklySummary> {
        let period_start = now - Duration::days(WEEKLY_WINDOW_DAYS);
        let entries = self.store().entries_since(user_id, period_start).await?;

        if entries.is_empty() {
            return Ok(WeeklySummary {
                summary: NO_WEEKLY_ENTRIES_MESSAGE.to_string(),
                entry_count: 0,
                period_start,
                period_end: now,
                generated_at: Utc::now(),
            });
        }

        if !self.generator_available() {
            return Err(InsightError::ServiceUnavailable(
                AI_UNAVAILABLE_MESSAGE.to_string(),
            ));
        }

        let summary = self
            .processor
            .generator()
            .generate_weekly_summary(&entries)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to generate weekly summary");
                InsightError::from(e)
            })?;

        Ok(WeeklySummary {
            summary,
            entry_count: entries.len(),
            period_start,
            period_end: now,
            generated_at: Utc::now(),
        })
    }

    /// Stored insight state for several entries. Never generates.
    pub async fn batch_insights(&self, user_id: &str, entry_ids: &[String]) -> Result<Vec<BatchItem>> {
        if entry_ids.len() > MAX_BATCH_IDS {
            return Err(InsightError::InvalidRequest {
                message: format!("Maximum {MAX_BATCH_IDS} entries per batch request"),
            });
        }

        let mut items = Vec::with_capacity(entry_ids.len());
        for entry_id in entry_ids {
            let item = match self.store().get(entry_id).await? {
                Some(entry) if entry.user_id == user_id => BatchItem::found(&entry),
                _ => BatchItem::missing(entry_id),
            };
            items.push(item);
        }
        Ok(items)
    }

    pub async fn status(&self, user_id: &str) -> Result<AiStatus> {
        let check = self.processor.generator().test_connection().await;
        let counts = self.store().state_counts(user_id).await?;
        Ok(AiStatus::new(check.available, check.message, counts))
    }

    /// Store a new pending entry and nudge the background loop
    #[instrument(skip(self, new_entry))]
    pub async fn create_entry(&self, user_id: &str, new_entry: NewEntry) -> Result<JournalEntry> {
        let entry = JournalEntry::new(
            user_id,
            new_entry.mood,
            new_entry.text_note,
            new_entry.audio_file,
            new_entry.entry_date.unwrap_or_else(Utc::now),
        )?;
        self.store().insert(&entry).await?;
        info!(entry_id = %entry.id, "Mood entry created");

        self.processor.notify_new_entry(&entry.id).await;
        Ok(entry)
    }

    /// Return a terminal entry to pending so the loop picks it up again
    #[instrument(skip(self))]
    pub async fn reset_entry(&self, user_id: &str, entry_id: &str) -> Result<JournalEntry> {
        let mut entry = self.owned_entry(user_id, entry_id).await?;
        if entry.is_pending() {
            return Ok(entry);
        }

        entry.reset();
        self.store().save(&entry).await?;
        info!(entry_id, "Entry reset for reprocessing");

        self.processor.notify_new_entry(entry_id).await;
        Ok(entry)
    }
}
