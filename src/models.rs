//! Core data models used throughout qna-harness.
//!
//! These are the records persisted in the three JSON files and the turns
//! that make up a conversation transcript.

use serde::{Deserialize, Serialize};

/// One row of the static Q&A table.
///
/// Older data files use the Indonesian keys `tanya` / `jawab`; both spellings
/// are accepted. Missing fields read as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QnaEntry {
    #[serde(default, alias = "tanya")]
    pub question: String,
    #[serde(default, alias = "jawab")]
    pub answer: String,
}

/// One resolved exchange in the durable log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub user: String,
    pub ai: String,
}

/// An element of the historical-message corpus.
///
/// The corpus file may hold bare strings or logged pairs. Anything else is
/// kept as raw JSON and never matched against. Writers append to the raw
/// records instead of re-serializing these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorpusEntry {
    Text(String),
    Exchange(LogEntry),
    Qna {
        #[serde(alias = "tanya")]
        question: String,
        #[serde(alias = "jawab")]
        answer: String,
    },
    Other(serde_json::Value),
}

impl CorpusEntry {
    /// The text that gets embedded and compared against incoming messages.
    pub fn key_text(&self) -> Option<&str> {
        match self {
            CorpusEntry::Text(text) => Some(text),
            CorpusEntry::Exchange(entry) => Some(&entry.user),
            CorpusEntry::Qna { question, .. } => Some(question),
            CorpusEntry::Other(_) => None,
        }
    }

    /// The text returned to the user when this entry is the best match.
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            CorpusEntry::Text(text) => Some(text),
            CorpusEntry::Exchange(entry) => Some(&entry.ai),
            CorpusEntry::Qna { answer, .. } => Some(answer),
            CorpusEntry::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a conversation transcript, in chat-completion wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
