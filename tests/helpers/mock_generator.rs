//! Scripted in-process insight generator.

use async_trait::async_trait;
use mood_insights::insights::generator::{ConnectionCheck, EMPTY_WEEK_SUMMARY};
use mood_insights::insights::{GeneratorError, InsightGenerator, InsightRequest};
use mood_insights::JournalEntry;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct MockGenerator {
    available: bool,
    scripted: Mutex<VecDeque<Result<String, GeneratorError>>>,
    fallback: Result<String, GeneratorError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    weekly_calls: AtomicUsize,
    requests: Mutex<Vec<InsightRequest>>,
    weekly_inputs: Mutex<Vec<Vec<String>>>,
}

impl MockGenerator {
    pub fn available() -> Self {
        Self {
            available: true,
            scripted: Mutex::new(VecDeque::new()),
            fallback: Ok("You're doing great.".to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            weekly_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            weekly_inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }

    /// Queue a response for the next call; later calls use the fallback
    pub fn then(self, response: Result<String, GeneratorError>) -> Self {
        self.scripted.lock().unwrap().push_back(response);
        self
    }

    pub fn with_fallback(mut self, response: Result<String, GeneratorError>) -> Self {
        self.fallback = response;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, response: Result<String, GeneratorError>) {
        self.scripted.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most generation calls that were ever in progress at once
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn weekly_calls(&self) -> usize {
        self.weekly_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<InsightRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Entry ids passed to each weekly summary call
    pub fn weekly_inputs(&self) -> Vec<Vec<String>> {
        self.weekly_inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl InsightGenerator for MockGenerator {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn generate_insight(&self, request: &InsightRequest) -> Result<String, GeneratorError> {
        // Counted before the availability check so skipped calls stay visible
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(GeneratorError::NotConfigured("API key not configured".into()));
        }
        self.requests.lock().unwrap().push(request.clone());

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        let next = self.scripted.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    async fn generate_weekly_summary(
        &self,
        entries: &[JournalEntry],
    ) -> Result<String, GeneratorError> {
        if entries.is_empty() {
            return Ok(EMPTY_WEEK_SUMMARY.to_string());
        }
        self.weekly_calls.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(GeneratorError::NotConfigured("API key not configured".into()));
        }
        self.weekly_inputs
            .lock()
            .unwrap()
            .push(entries.iter().map(|entry| entry.id.clone()).collect());
        Ok(format!("Summary of {} entries", entries.len()))
    }

    async fn test_connection(&self) -> ConnectionCheck {
        if self.available {
            ConnectionCheck::ok("Connection successful")
        } else {
            ConnectionCheck::failed("API key not configured")
        }
    }
}
