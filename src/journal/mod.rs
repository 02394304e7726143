//! Mood journal entries and the storage they live in.

pub mod connection;
pub mod models;
pub mod repository;
pub mod store;

pub use models::{Emotion, JournalEntry, Mood, ProcessingFields, ProcessingState};
pub use repository::PgEntryStore;
pub use store::{EntryStore, MemoryEntryStore, StateCounts};
