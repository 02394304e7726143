//! Journal entry data model and the insight processing state machine.
//!
//! An entry's AI processing state is stored as the flag/field set the
//! persistent store keeps (`ai_processed`, `ai_processing_failed`,
//! `ai_insight`, `ai_error_message`, `ai_processed_at`). Those fields are only
//! mutated through [`JournalEntry::mark_complete`], [`JournalEntry::mark_failed`]
//! and [`JournalEntry::reset`], which keeps the two flags mutually exclusive.

use crate::error::{InsightError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum length of a text note, in characters.
pub const MAX_TEXT_NOTE_CHARS: usize = 2000;

/// Emotion used when an entry carries no mood.
pub const DEFAULT_EMOTION: &str = "neutral";

/// Emoji used when an entry carries no mood.
pub const DEFAULT_EMOJI: &str = "😐";

/// Fixed set of emotions a mood entry can be tagged with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Neutral,
    Angry,
    Anxious,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Neutral,
        Emotion::Angry,
        Emotion::Anxious,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Neutral => "neutral",
            Emotion::Angry => "angry",
            Emotion::Anxious => "anxious",
        }
    }

    /// Human-readable description used in prompts
    pub fn description(&self) -> &'static str {
        match self {
            Emotion::Happy => "Feeling joyful and positive",
            Emotion::Sad => "Experiencing sadness or melancholy",
            Emotion::Neutral => "Feeling balanced and calm",
            Emotion::Angry => "Experiencing frustration or anger",
            Emotion::Anxious => "Feeling worried or anxious",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "happy" => Ok(Emotion::Happy),
            "sad" => Ok(Emotion::Sad),
            "neutral" => Ok(Emotion::Neutral),
            "angry" => Ok(Emotion::Angry),
            "anxious" => Ok(Emotion::Anxious),
            other => Err(InsightError::InvalidData {
                message: format!(
                    "Unknown emotion '{other}'. Must be one of: happy, sad, neutral, angry, anxious"
                ),
            }),
        }
    }
}

/// The emotion and emoji a user picked for an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mood {
    pub emotion: Emotion,
    pub emoji: String,
}

impl Mood {
    pub fn new(emotion: Emotion, emoji: impl Into<String>) -> Self {
        Self {
            emotion,
            emoji: emoji.into(),
        }
    }
}

/// Derived processing state of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    /// No insight yet and no failed attempt
    Pending,
    /// Insight generated and stored
    Processed,
    /// Last attempt failed, waiting for an explicit reset
    Failed,
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProcessingState::Pending => "pending",
            ProcessingState::Processed => "processed",
            ProcessingState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// A single mood journal record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub user_id: String,
    pub mood: Option<Mood>,
    pub text_note: Option<String>,
    /// Reference to a stored audio recording, if one was attached
    pub audio_file: Option<String>,
    pub entry_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    ai_insight: Option<String>,
    ai_processed: bool,
    ai_processing_failed: bool,
    ai_error_message: Option<String>,
    ai_processed_at: Option<DateTime<Utc>>,
}

/// Raw processing-state fields, as read back from a store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingFields {
    pub ai_insight: Option<String>,
    pub ai_processed: bool,
    pub ai_processing_failed: bool,
    pub ai_error_message: Option<String>,
    pub ai_processed_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    /// Create a new pending entry with a fresh id
    pub fn new(
        user_id: impl Into<String>,
        mood: Option<Mood>,
        text_note: Option<String>,
        audio_file: Option<String>,
        entry_date: DateTime<Utc>,
    ) -> Result<Self> {
        if let Some(note) = &text_note {
            if note.chars().count() > MAX_TEXT_NOTE_CHARS {
                return Err(InsightError::InvalidData {
                    message: format!("Text note exceeds {MAX_TEXT_NOTE_CHARS} characters"),
                });
            }
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            mood,
            text_note,
            audio_file,
            entry_date,
            created_at: now,
            updated_at: now,
            ai_insight: None,
            ai_processed: false,
            ai_processing_failed: false,
            ai_error_message: None,
            ai_processed_at: None,
        })
    }

    /// Rebuild an entry from persisted columns.
    ///
    /// Rejects rows where both processing flags are set.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: String,
        user_id: String,
        mood: Option<Mood>,
        text_note: Option<String>,
        audio_file: Option<String>,
        entry_date: DateTime<Utc>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        processing: ProcessingFields,
    ) -> Result<Self> {
        if processing.ai_processed && processing.ai_processing_failed {
            return Err(InsightError::InvalidData {
                message: format!("Entry {id} is marked both processed and failed"),
            });
        }

        Ok(Self {
            id,
            user_id,
            mood,
            text_note,
            audio_file,
            entry_date,
            created_at,
            updated_at,
            ai_insight: processing.ai_insight,
            ai_processed: processing.ai_processed,
            ai_processing_failed: processing.ai_processing_failed,
            ai_error_message: processing.ai_error_message,
            ai_processed_at: processing.ai_processed_at,
        })
    }

    pub fn ai_insight(&self) -> Option<&str> {
        self.ai_insight.as_deref()
    }

    pub fn ai_processed(&self) -> bool {
        self.ai_processed
    }

    pub fn ai_processing_failed(&self) -> bool {
        self.ai_processing_failed
    }

    pub fn ai_error_message(&self) -> Option<&str> {
        self.ai_error_message.as_deref()
    }

    pub fn ai_processed_at(&self) -> Option<DateTime<Utc>> {
        self.ai_processed_at
    }

    pub fn processing_fields(&self) -> ProcessingFields {
        ProcessingFields {
            ai_insight: self.ai_insight.clone(),
            ai_processed: self.ai_processed,
            ai_processing_failed: self.ai_processing_failed,
            ai_error_message: self.ai_error_message.clone(),
            ai_processed_at: self.ai_processed_at,
        }
    }

    pub fn state(&self) -> ProcessingState {
        match (self.ai_processed, self.ai_processing_failed) {
            (true, _) => ProcessingState::Processed,
            (false, true) => ProcessingState::Failed,
            (false, false) => ProcessingState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == ProcessingState::Pending
    }

    /// True when the note has non-whitespace text or audio is attached
    pub fn has_content_for_ai(&self) -> bool {
        let has_note = self
            .text_note
            .as_deref()
            .map(|note| !note.trim().is_empty())
            .unwrap_or(false);
        has_note || self.audio_file.is_some()
    }

    /// Emotion tag to send to the generator, defaulting when no mood is set
    pub fn emotion_tag(&self) -> &str {
        self.mood
            .as_ref()
            .map(|mood| mood.emotion.as_str())
            .unwrap_or(DEFAULT_EMOTION)
    }

    pub fn emoji(&self) -> &str {
        self.mood
            .as_ref()
            .map(|mood| mood.emoji.as_str())
            .unwrap_or(DEFAULT_EMOJI)
    }

    pub fn mark_complete(&mut self, insight: impl Into<String>) {
        let now = Utc::now();
        self.ai_insight = Some(insight.into());
        self.ai_processed = true;
        self.ai_processing_failed = false;
        self.ai_error_message = None;
        self.ai_processed_at = Some(now);
        self.updated_at = now;
    }

    pub fn mark_failed(&mut self, error_message: impl Into<String>) {
        let now = Utc::now();
        self.ai_insight = None;
        self.ai_processed = false;
        self.ai_processing_failed = true;
        self.ai_error_message = Some(error_message.into());
        self.ai_processed_at = Some(now);
        self.updated_at = now;
    }

    /// Return the entry to pending so it is picked up again
    pub fn reset(&mut self) {
        self.ai_insight = None;
        self.ai_processed = false;
        self.ai_processing_failed = false;
        self.ai_error_message = None;
        self.ai_processed_at = None;
        self.updated_at = Utc::now();
    }
}
