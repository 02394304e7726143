//! Insight generation for mood journal entries.
//!
//! The generator wraps the external text-generation call, the processor drives
//! pending entries through it in the background, and the service exposes the
//! request-level operations built on both.

pub mod generator;
pub mod processor;
pub mod prompt;
pub mod service;

pub use generator::{
    ConnectionCheck, GeneratorConfig, GeneratorError, InsightGenerator, OpenAiGenerator,
};
pub use processor::{
    InsightProcessor, InsightSource, ProcessOutcome, ProcessingStats, ProcessorConfig,
};
pub use prompt::InsightRequest;
pub use service::{AiStatus, BatchItem, EntryInsight, InsightService, NewEntry, WeeklySummary};
