//! Background insight processor.
//!
//! Drains pending journal entries through the insight generator in small
//! batches and records the outcome on each entry. The same single-entry step
//! backs the on-demand path used when a caller asks for an insight that has not
//! been produced yet.
//!
//! Two paths can target the same entry. An in-process in-flight set keeps them
//! from generating concurrently, and terminal writes go through
//! [`EntryStore::save_if_pending`] so the first one to land wins.

use super::generator::InsightGenerator;
use super::prompt::InsightRequest;
use crate::error::{InsightError, Result};
use crate::journal::models::{JournalEntry, ProcessingState};
use crate::journal::store::EntryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Failure recorded when no generator credential is configured
pub const AI_UNAVAILABLE_MESSAGE: &str = "AI service not available";

/// Insight stored for entries that carry neither a note nor a recording
pub const NO_CONTENT_PLACEHOLDER: &str =
    "No content available for insight generation. Please add a text note or voice recording.";

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Pending entries fetched per iteration
    pub batch_size: usize,
    /// Sleep when no pending entries were found
    pub idle_poll_interval: Duration,
    /// Sleep between non-empty batches
    pub batch_pause: Duration,
    /// Sleep after an iteration failed as a whole
    pub error_backoff: Duration,
    /// How long `stop()` waits for the loop to exit
    pub stop_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            idle_poll_interval: Duration::from_secs(30),
            batch_pause: Duration::from_secs(10),
            error_backoff: Duration::from_secs(60),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

/// Runtime counters since the processor was built
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub entries_processed: u64,
    pub entries_failed: u64,
    pub batches_completed: u64,
    pub loop_errors: u64,
    pub last_processed_at: Option<DateTime<Utc>>,
}

/// Where the insight in an on-demand result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSource {
    /// Entry was already terminal
    Stored,
    /// Produced by this call
    Generated,
    /// No content, placeholder recorded without calling the generator
    Placeholder,
    /// Another path is generating for this entry right now
    InProgress,
}

/// Result of [`InsightProcessor::process_one_synchronously`]
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub success: bool,
    pub source: InsightSource,
    pub entry: JournalEntry,
}

impl ProcessOutcome {
    fn in_progress(entry: JournalEntry) -> Self {
        Self {
            success: false,
            source: InsightSource::InProgress,
            entry,
        }
    }

    fn from_entry(entry: JournalEntry, source: InsightSource) -> Self {
        Self {
            success: entry.state() == ProcessingState::Processed,
            source,
            entry,
        }
    }
}

#[derive(Debug, Default)]
struct RunControl {
    stop: AtomicBool,
    /// Cuts short the idle sleep only
    wake: Notify,
    /// Cuts short any sleep once a stop is requested
    halt: Notify,
}

impl RunControl {
    fn stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.halt.notify_waiters();
    }

    fn resume(&self) {
        self.stop.store(false, Ordering::SeqCst);
    }
}

struct Worker {
    control: Arc<RunControl>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn is_alive(&self) -> bool {
        !self.handle.is_finished() && !self.control.stopping()
    }
}

type InFlightSet = Arc<StdMutex<HashSet<String>>>;

/// Removes its entry id from the in-flight set when dropped
struct InFlightGuard {
    set: InFlightSet,
    entry_id: String,
}

impl InFlightGuard {
    fn claim(set: &InFlightSet, entry_id: &str) -> Option<Self> {
        let mut ids = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !ids.insert(entry_id.to_string()) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            entry_id: entry_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut ids = self
            .set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        ids.remove(&self.entry_id);
    }
}

/// Handle to the insight pipeline. Cloning shares the same worker and state.
#[derive(Clone)]
pub struct InsightProcessor {
    store: Arc<dyn EntryStore>,
    generator: Arc<dyn InsightGenerator>,
    config: ProcessorConfig,
    worker: Arc<Mutex<Option<Worker>>>,
    in_flight: InFlightSet,
    stats: Arc<Mutex<ProcessingStats>>,
}

impl InsightProcessor {
    pub fn new(
        store: Arc<dyn EntryStore>,
        generator: Arc<dyn InsightGenerator>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            store,
            generator,
            config,
            worker: Arc::new(Mutex::new(None)),
            in_flight: Arc::new(StdMutex::new(HashSet::new())),
            stats: Arc::new(Mutex::new(ProcessingStats::default())),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    pub fn generator(&self) -> &Arc<dyn InsightGenerator> {
        &self.generator
    }

    /// Launch the background loop unless one is already alive
    pub async fn start(&self) {
        let mut worker = self.worker.lock().await;
        self.ensure_running(&mut worker);
    }

    /// Ask the loop to exit and wait up to the configured stop timeout.
    /// Returns regardless; a loop still inside a generator call exits at its
    /// next checkpoint. Until then its handle stays registered, so a later
    /// `start()` resumes that loop instead of spawning a second one.
    pub async fn stop(&self) {
        let mut worker = self.worker.lock().await;
        let Some(current) = worker.as_mut() else {
            debug!("Insight processor not running");
            return;
        };

        current.control.request_stop();
        let joined = tokio::time::timeout(self.config.stop_timeout, &mut current.handle).await;
        match joined {
            Ok(result) => {
                *worker = None;
                match result {
                    Ok(()) => info!("Insight processor stopped"),
                    Err(e) => error!(error = %e, "Insight processor task ended abnormally"),
                }
            }
            Err(_) => warn!(
                timeout_ms = self.config.stop_timeout.as_millis() as u64,
                "Insight processor did not stop in time; it will exit at its next checkpoint"
            ),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(Worker::is_alive)
    }

    /// Make sure the loop runs and cut short an idle sleep. Gives no guarantee
    /// that the entry is processed immediately.
    pub async fn notify_new_entry(&self, entry_id: &str) {
        debug!(entry_id, "New entry queued for insight processing");
        let mut worker = self.worker.lock().await;
        self.ensure_running(&mut worker);
        if let Some(worker) = worker.as_ref() {
            worker.control.wake.notify_one();
        }
    }

    pub async fn stats(&self) -> ProcessingStats {
        self.stats.lock().await.clone()
    }

    /// Produce or return the insight for one entry on the caller's task
    #[instrument(skip(self))]
    pub async fn process_one_synchronously(&self, entry_id: &str) -> Result<ProcessOutcome> {
        let entry = self.load(entry_id).await?;
        if !entry.is_pending() {
            return Ok(ProcessOutcome::from_entry(entry, InsightSource::Stored));
        }

        let Some(_guard) = InFlightGuard::claim(&self.in_flight, entry_id) else {
            debug!(entry_id, "Entry already being processed");
            return Ok(ProcessOutcome::in_progress(entry));
        };

        // The loop may have finished it between the first read and the claim.
        let entry = self.load(entry_id).await?;
        if !entry.is_pending() {
            return Ok(ProcessOutcome::from_entry(entry, InsightSource::Stored));
        }

        self.process_claimed(entry).await
    }

    /// Return an entry to pending and generate for it again on the caller's
    /// task. The entry stays claimed from the reset until the new outcome is
    /// written, so the background loop cannot pick it up in between.
    #[instrument(skip(self))]
    pub async fn regenerate(&self, entry_id: &str) -> Result<ProcessOutcome> {
        let Some(_guard) = InFlightGuard::claim(&self.in_flight, entry_id) else {
            debug!(entry_id, "Entry already being processed");
            let entry = self.load(entry_id).await?;
            return Ok(ProcessOutcome::in_progress(entry));
        };

        let mut entry = self.load(entry_id).await?;
        entry.reset();
        self.store.save(&entry).await?;
        info!(entry_id, "Entry reset for regeneration");

        self.process_claimed(entry).await
    }

    /// Single-entry step for a pending entry the caller holds the claim on
    async fn process_claimed(&self, mut entry: JournalEntry) -> Result<ProcessOutcome> {
        if !entry.has_content_for_ai() {
            entry.mark_complete(NO_CONTENT_PLACEHOLDER);
            let entry = self.persist_terminal(entry).await?;
            self.record(&entry).await;
            return Ok(ProcessOutcome::from_entry(entry, InsightSource::Placeholder));
        }

        let entry = self.process_entry(entry).await?;
        self.record(&entry).await;
        Ok(ProcessOutcome::from_entry(entry, InsightSource::Generated))
    }

    async fn load(&self, entry_id: &str) -> Result<JournalEntry> {
        self.store
            .get(entry_id)
            .await?
            .ok_or_else(|| InsightError::NotFound {
                id: entry_id.to_string(),
            })
    }

    fn ensure_running(&self, worker: &mut Option<Worker>) {
        if let Some(current) = worker.as_ref() {
            if !current.handle.is_finished() {
                if current.control.stopping() {
                    current.control.resume();
                    info!("Insight processor resumed before it exited");
                } else {
                    debug!("Insight processor already running");
                }
                return;
            }
        }

        let control = Arc::new(RunControl::default());
        let handle = tokio::spawn(self.clone().run(Arc::clone(&control)));
        *worker = Some(Worker { control, handle });
        info!(
            batch_size = self.config.batch_size,
            "Insight processor started"
        );
    }

    async fn run(self, control: Arc<RunControl>) {
        loop {
            if control.stopping() {
                break;
            }

            let (pause, idle) = match self.run_batch(&control).await {
                Ok(0) => (self.config.idle_poll_interval, true),
                Ok(count) => {
                    debug!(batch_size = count, "Batch complete");
                    (self.config.batch_pause, false)
                }
                Err(e) => {
                    error!(error = %e, "Insight processing iteration failed");
                    self.stats.lock().await.loop_errors += 1;
                    (self.config.error_backoff, false)
                }
            };

            // Registered before the flag check so a concurrent stop is not missed
            let halted = control.halt.notified();
            tokio::pin!(halted);
            halted.as_mut().enable();

            if control.stopping() {
                break;
            }

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(pause) => {}
                    _ = &mut halted => {}
                    _ = control.wake.notified() => debug!("Insight processor woken"),
                }
            } else {
                tokio::select! {
                    _ = tokio::time::sleep(pause) => {}
                    _ = &mut halted => {}
                }
            }
        }
        info!("Insight processor loop exited");
    }

    /// One fetch-and-process pass. Returns how many entries were fetched.
    async fn run_batch(&self, control: &RunControl) -> Result<usize> {
        let batch = self.store.get_unprocessed(self.config.batch_size).await?;
        if batch.is_empty() {
            return Ok(0);
        }

        let count = batch.len();
        info!(batch_size = count, "Processing pending entries");

        for entry in batch {
            if control.stopping() {
                break;
            }

            let Some(_guard) = InFlightGuard::claim(&self.in_flight, &entry.id) else {
                debug!(entry_id = %entry.id, "Skipping entry claimed elsewhere");
                continue;
            };

            let entry_id = entry.id.clone();
            let fallback = entry.clone();
            match self.process_entry(entry).await {
                Ok(processed) => self.record(&processed).await,
                Err(e) => {
                    error!(entry_id = %entry_id, error = %e, "Failed to process entry");
                    self.fail_entry(fallback, &e).await;
                }
            }
        }

        self.stats.lock().await.batches_completed += 1;
        Ok(count)
    }

    /// Generate for a pending entry and persist the terminal state
    async fn process_entry(&self, mut entry: JournalEntry) -> Result<JournalEntry> {
        if !self.generator.is_available() {
            warn!(entry_id = %entry.id, "AI service not available");
            entry.mark_failed(AI_UNAVAILABLE_MESSAGE);
        } else {
            let request = InsightRequest::from_entry(&entry);
            match self.generator.generate_insight(&request).await {
                Ok(insight) => {
                    info!(entry_id = %entry.id, "Generated insight");
                    entry.mark_complete(insight);
                }
                Err(e) => {
                    warn!(entry_id = %entry.id, error = %e, "Insight generation failed");
                    entry.mark_failed(e.to_string());
                }
            }
        }

        self.persist_terminal(entry).await
    }

    /// Write a terminal state unless another path already did. The returned
    /// entry is whatever the store now holds.
    async fn persist_terminal(&self, entry: JournalEntry) -> Result<JournalEntry> {
        if self.store.save_if_pending(&entry).await? {
            return Ok(entry);
        }

        debug!(entry_id = %entry.id, "Entry already finalized elsewhere");
        self.load(&entry.id).await
    }

    async fn fail_entry(&self, mut entry: JournalEntry, cause: &InsightError) {
        entry.mark_failed(format!("Processing error: {cause}"));
        match self.store.save_if_pending(&entry).await {
            Ok(_) => self.record(&entry).await,
            Err(e) => error!(
                entry_id = %entry.id,
                error = %e,
                "Could not record processing failure"
            ),
        }
    }

    async fn record(&self, entry: &JournalEntry) {
        let mut stats = self.stats.lock().await;
        match entry.state() {
            ProcessingState::Processed => stats.entries_processed += 1,
            ProcessingState::Failed => stats.entries_failed += 1,
            ProcessingState::Pending => return,
        }
        stats.last_processed_at = Some(Utc::now());
    }
}
