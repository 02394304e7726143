use crate::application::{ApplicationLifecycle, DependencyContainer};
use crate::error::InsightError;
use crate::insights::NewEntry;
use crate::journal::{Emotion, Mood};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Print a command result as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn service_error(e: InsightError) -> anyhow::Error {
    anyhow::anyhow!("{} (status {})", e, e.http_status())
}

/// Runs the background insight worker until a shutdown signal arrives
pub struct WorkerCommandHandler {
    container: Arc<DependencyContainer>,
    lifecycle: Arc<ApplicationLifecycle>,
}

impl WorkerCommandHandler {
    pub fn new(container: Arc<DependencyContainer>, lifecycle: Arc<ApplicationLifecycle>) -> Self {
        Self {
            container,
            lifecycle,
        }
    }

    pub async fn run(&self) -> Result<()> {
        self.container.processor.start().await;
        info!("Insight worker running. Press Ctrl+C to stop.");

        self.lifecycle.wait_for_shutdown().await;

        let stats = self.container.processor.stats().await;
        info!(
            entries_processed = stats.entries_processed,
            entries_failed = stats.entries_failed,
            batches_completed = stats.batches_completed,
            "Insight worker summary"
        );
        Ok(())
    }
}

pub struct DatabaseCommandHandler {
    container: Arc<DependencyContainer>,
}

impl DatabaseCommandHandler {
    pub fn new(container: Arc<DependencyContainer>) -> Self {
        Self { container }
    }

    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");
        self.container.entry_store.migrate().await?;
        info!("Migrations completed");
        Ok(())
    }
}

/// Entry and insight operations, one per CLI subcommand
pub struct EntryCommandHandler {
    container: Arc<DependencyContainer>,
}

impl EntryCommandHandler {
    pub fn new(container: Arc<DependencyContainer>) -> Self {
        Self { container }
    }

    pub async fn add(
        &self,
        user_id: &str,
        emotion: Option<Emotion>,
        emoji: Option<String>,
        note: Option<String>,
        audio: Option<String>,
        date: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mood = emotion.map(|emotion| Mood::new(emotion, emoji.unwrap_or_default()));
        let entry = self
            .container
            .service
            .create_entry(
                user_id,
                NewEntry {
                    mood,
                    text_note: note,
                    audio_file: audio,
                    entry_date: date,
                },
            )
            .await
            .map_err(service_error)?;
        print_json(&entry)
    }

    pub async fn insight(&self, user_id: &str, entry_id: &str) -> Result<()> {
        let insight = self
            .container
            .service
            .entry_insight(user_id, entry_id)
            .await
            .map_err(service_error)?;
        print_json(&insight)
    }

    pub async fn regenerate(&self, user_id: &str, entry_id: &str) -> Result<()> {
        let insight = self
            .container
            .service
            .regenerate(user_id, entry_id)
            .await
            .map_err(service_error)?;
        print_json(&insight)
    }

    pub async fn reset(&self, user_id: &str, entry_id: &str) -> Result<()> {
        let entry = self
            .container
            .service
            .reset_entry(user_id, entry_id)
            .await
            .map_err(service_error)?;
        print_json(&entry)
    }

    pub async fn weekly(&self, user_id: &str) -> Result<()> {
        let summary = self
            .container
            .service
            .weekly_summary(user_id, Utc::now())
            .await
            .map_err(service_error)?;
        print_json(&summary)
    }

    pub async fn batch(&self, user_id: &str, entry_ids: &[String]) -> Result<()> {
        let items = self
            .container
            .service
            .batch_insights(user_id, entry_ids)
            .await
            .map_err(service_error)?;
        print_json(&items)
    }

    pub async fn status(&self, user_id: &str) -> Result<()> {
        let status = self
            .container
            .service
            .status(user_id)
            .await
            .map_err(service_error)?;
        print_json(&status)
    }
}
