//! Deterministic prompt construction for insight and weekly summary requests.

use crate::journal::models::{Emotion, JournalEntry};

/// Stand-in text sent when an entry has a voice recording attached
pub const AUDIO_PLACEHOLDER: &str = "[Voice note recorded]";

/// Description used for emotion tags outside the known set
pub const UNKNOWN_EMOTION: &str = "Unknown emotion";

/// Weekly summary lines keep at most this many characters of each note
pub const WEEKLY_NOTE_CHARS: usize = 100;

pub const INSIGHT_SYSTEM_PROMPT: &str = "You are a compassionate AI assistant specializing in emotional well-being and mental health support. Your role is to provide gentle, supportive insights about mood patterns and emotional experiences.

Guidelines:
- Keep responses to 2-3 sentences maximum
- Focus on actionable, positive guidance
- Be empathetic and non-judgmental
- Avoid giving medical advice
- Highlight patterns and suggest healthy coping strategies
- Use warm, encouraging language
- If mood is low, offer gentle support and suggestions
- If mood is high, celebrate while encouraging balance

Remember: You're providing supportive insights, not therapy or medical advice.";

pub const WEEKLY_SYSTEM_PROMPT: &str = "You are an AI assistant that analyzes weekly mood patterns and provides supportive summaries. Focus on trends, patterns, and gentle encouragement.";

/// Inputs for a single-entry insight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightRequest {
    pub emotion: String,
    pub emoji: Option<String>,
    pub text_note: Option<String>,
    pub audio_marker: Option<String>,
}

impl InsightRequest {
    pub fn new(emotion: impl Into<String>) -> Self {
        Self {
            emotion: emotion.into(),
            emoji: None,
            text_note: None,
            audio_marker: None,
        }
    }

    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.text_note = Some(note.into());
        self
    }

    pub fn with_audio(mut self, marker: impl Into<String>) -> Self {
        self.audio_marker = Some(marker.into());
        self
    }

    /// Build the request for an entry, substituting neutral defaults when the
    /// entry has no mood
    pub fn from_entry(entry: &JournalEntry) -> Self {
        Self {
            emotion: entry.emotion_tag().to_string(),
            emoji: Some(entry.emoji().to_string()),
            text_note: entry.text_note.clone(),
            audio_marker: entry
                .audio_file
                .as_ref()
                .map(|_| AUDIO_PLACEHOLDER.to_string()),
        }
    }
}

pub fn emotion_description(emotion: &str) -> &'static str {
    emotion
        .parse::<Emotion>()
        .map(|emotion| emotion.description())
        .unwrap_or(UNKNOWN_EMOTION)
}

fn title_case(word: &str) -> String {
    let mut chars = word.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

pub fn build_insight_prompt(request: &InsightRequest) -> String {
    let mut emotion_line = format!("Emotion: {}", title_case(&request.emotion));
    if let Some(emoji) = non_blank(request.emoji.as_deref()) {
        emotion_line.push(' ');
        emotion_line.push_str(emoji);
    }
    emotion_line.push_str(&format!(" ({})", emotion_description(&request.emotion)));

    let mut parts = vec![
        "Please provide a supportive insight based on this mood entry:".to_string(),
        emotion_line,
    ];

    let note = non_blank(request.text_note.as_deref());
    let audio = non_blank(request.audio_marker.as_deref());

    if let Some(note) = note {
        parts.push(format!("Reflection: {note}"));
    }
    if let Some(audio) = audio {
        parts.push(format!("Voice Note: {audio}"));
    }
    if note.is_none() && audio.is_none() {
        parts.push("Note: No additional reflection provided, only emotion selected.".to_string());
    }

    parts.push("\nProvide a brief, encouraging insight (2-3 sentences max):".to_string());
    parts.join("\n")
}

fn weekly_line(entry: &JournalEntry) -> String {
    let mut line = format!(
        "• {}: Mood {} {}/5",
        entry.entry_date.format("%A, %B %d"),
        entry.emotion_tag(),
        entry.emoji()
    );
    if let Some(note) = entry.text_note.as_deref().filter(|note| !note.is_empty()) {
        let truncated: String = note.chars().take(WEEKLY_NOTE_CHARS).collect();
        line.push_str(" - ");
        line.push_str(&truncated);
    }
    line
}

/// One line per entry, in the order given
pub fn build_weekly_prompt(entries: &[JournalEntry]) -> String {
    let mut parts = vec![
        "Analyze this week's mood entries and provide a supportive weekly summary:".to_string(),
        String::new(),
    ];
    parts.extend(entries.iter().map(weekly_line));
    parts.extend(
        [
            "",
            "Please provide:",
            "1. Overall mood trend for the week",
            "2. Any patterns you notice",
            "3. Encouraging insights or gentle suggestions",
            "",
            "Keep response to 3-4 sentences maximum.",
        ]
        .iter()
        .map(|line| line.to_string()),
    );
    parts.join("\n")
}
