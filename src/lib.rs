pub mod application;
pub mod config;
pub mod error;
pub mod insights;
pub mod journal;

pub use config::Config;
pub use error::{InsightError, Result};

pub use insights::{
    GeneratorConfig, GeneratorError, InsightGenerator, InsightProcessor, InsightService,
    OpenAiGenerator, ProcessorConfig,
};
pub use journal::{
    connection::create_pool, Emotion, EntryStore, JournalEntry, MemoryEntryStore, Mood,
    PgEntryStore, ProcessingState,
};
