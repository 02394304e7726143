use super::models::{Emotion, JournalEntry, Mood, ProcessingFields};
use super::store::{EntryStore, StateCounts};
use crate::error::{InsightError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};

const ENTRY_COLUMNS: &str = r#"
    id, user_id, mood_emotion, mood_emoji, text_note, audio_file_id,
    entry_date, created_at, updated_at,
    ai_insight, ai_processed, ai_processing_failed, ai_error_message, ai_processed_at
"#;

#[derive(Debug, FromRow)]
struct EntryRow {
    id: String,
    user_id: String,
    mood_emotion: Option<String>,
    mood_emoji: Option<String>,
    text_note: Option<String>,
    audio_file_id: Option<String>,
    entry_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    ai_insight: Option<String>,
    ai_processed: bool,
    ai_processing_failed: bool,
    ai_error_message: Option<String>,
    ai_processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<EntryRow> for JournalEntry {
    type Error = InsightError;

    fn try_from(row: EntryRow) -> Result<Self> {
        let mood = match row.mood_emotion {
            Some(emotion) => Some(Mood::new(
                emotion.parse::<Emotion>()?,
                row.mood_emoji.unwrap_or_default(),
            )),
            None => None,
        };

        JournalEntry::from_parts(
            row.id,
            row.user_id,
            mood,
            row.text_note,
            row.audio_file_id,
            row.entry_date,
            row.created_at,
            row.updated_at,
            ProcessingFields {
                ai_insight: row.ai_insight,
                ai_processed: row.ai_processed,
                ai_processing_failed: row.ai_processing_failed,
                ai_error_message: row.ai_error_message,
                ai_processed_at: row.ai_processed_at,
            },
        )
    }
}

/// PostgreSQL-backed entry store
#[derive(Debug, Clone)]
pub struct PgEntryStore {
    pool: PgPool,
}

impl PgEntryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn rows_to_entries(rows: Vec<EntryRow>) -> Result<Vec<JournalEntry>> {
        rows.into_iter().map(JournalEntry::try_from).collect()
    }
}

#[async_trait]
impl EntryStore for PgEntryStore {
    async fn insert(&self, entry: &JournalEntry) -> Result<()> {
        let fields = entry.processing_fields();
        sqlx::query(
            r#"
            INSERT INTO mood_entries (
                id, user_id, mood_emotion, mood_emoji, text_note, audio_file_id,
                entry_date, created_at, updated_at,
                ai_insight, ai_processed, ai_processing_failed, ai_error_message, ai_processed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(entry.mood.as_ref().map(|mood| mood.emotion.as_str()))
        .bind(entry.mood.as_ref().map(|mood| mood.emoji.as_str()))
        .bind(&entry.text_note)
        .bind(&entry.audio_file)
        .bind(entry.entry_date)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .bind(&fields.ai_insight)
        .bind(fields.ai_processed)
        .bind(fields.ai_processing_failed)
        .bind(&fields.ai_error_message)
        .bind(fields.ai_processed_at)
        .execute(&self.pool)
        .await?;

        debug!(entry_id = %entry.id, "Inserted mood entry");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<JournalEntry>> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM mood_entries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JournalEntry::try_from).transpose()
    }

    async fn get_unprocessed(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS} FROM mood_entries
            WHERE ai_processed = FALSE AND ai_processing_failed = FALSE
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Self::rows_to_entries(rows)
    }

    async fn save(&self, entry: &JournalEntry) -> Result<()> {
        let fields = entry.processing_fields();
        let result = sqlx::query(
            r#"
            UPDATE mood_entries
            SET ai_insight = $2,
                ai_processed = $3,
                ai_processing_failed = $4,
                ai_error_message = $5,
                ai_processed_at = $6,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(&entry.id)
        .bind(&fields.ai_insight)
        .bind(fields.ai_processed)
        .bind(fields.ai_processing_failed)
        .bind(&fields.ai_error_message)
        .bind(fields.ai_processed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InsightError::NotFound {
                id: entry.id.clone(),
            });
        }
        Ok(())
    }

    async fn save_if_pending(&self, entry: &JournalEntry) -> Result<bool> {
        let fields = entry.processing_fields();
        let result = sqlx::query(
            r#"
            UPDATE mood_entries
            SET ai_insight = $2,
                ai_processed = $3,
                ai_processing_failed = $4,
                ai_error_message = $5,
                ai_processed_at = $6,
                updated_at = NOW()
            WHERE id = $1
              AND ai_processed = FALSE
              AND ai_processing_failed = FALSE
            "#,
        )
        .bind(&entry.id)
        .bind(&fields.ai_insight)
        .bind(fields.ai_processed)
        .bind(fields.ai_processing_failed)
        .bind(&fields.ai_error_message)
        .bind(fields.ai_processed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Distinguish "lost the race" from "no such entry"
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM mood_entries WHERE id = $1)")
                .bind(&entry.id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(InsightError::NotFound {
                id: entry.id.clone(),
            });
        }
        Ok(false)
    }

    async fn entries_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS} FROM mood_entries
            WHERE user_id = $1 AND entry_date >= $2
            ORDER BY entry_date DESC
            "#
        ))
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Self::rows_to_entries(rows)
    }

    async fn state_counts(&self, user_id: &str) -> Result<StateCounts> {
        let (total, processed, failed, pending): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE ai_processed),
                COUNT(*) FILTER (WHERE ai_processing_failed),
                COUNT(*) FILTER (WHERE NOT ai_processed AND NOT ai_processing_failed)
            FROM mood_entries
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(StateCounts {
            total: total as u64,
            processed: processed as u64,
            failed: failed as u64,
            pending: pending as u64,
        })
    }
}
