#![allow(dead_code)]

pub mod chat_mock;
pub mod faulty_store;
pub mod mock_generator;

use mood_insights::journal::{Emotion, JournalEntry, Mood};
use mood_insights::ProcessorConfig;
use std::future::Future;
use std::time::Duration;

/// Processor timings short enough for tests
pub fn fast_config() -> ProcessorConfig {
    ProcessorConfig {
        batch_size: 5,
        idle_poll_interval: Duration::from_millis(20),
        batch_pause: Duration::from_millis(10),
        error_backoff: Duration::from_millis(30),
        stop_timeout: Duration::from_secs(1),
    }
}

pub fn entry(user: &str, emotion: Emotion, note: Option<&str>) -> JournalEntry {
    JournalEntry::new(
        user,
        Some(Mood::new(emotion, "🙂")),
        note.map(str::to_string),
        None,
        chrono::Utc::now(),
    )
    .expect("valid entry")
}

/// Poll `check` until it returns true or the timeout elapses
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
