//! Inbound updates delivered by the messaging transport.
//!
//! The transport adapter maps platform payloads onto these types: a message
//! carries a sender, free-form text, and at most one attachment; a callback
//! query carries the data of a pressed inline button.

use serde::{Deserialize, Serialize};

use crate::form::GeoPoint;

/// A formatting span inside a text or caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEntity {
    /// Entity kind as reported by the platform ("bold", "text_link", ...).
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: u32,
    pub length: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The author of an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

/// A file stored by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    pub file_id: String,
    pub file_unique_id: String,
}

/// The single attachment a message may carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    /// A photo in several resolutions, ordered from smallest to largest.
    Image { sizes: Vec<FileHandle> },
    Voice(FileHandle),
    Audio(FileHandle),
    Video(FileHandle),
    VideoNote(FileHandle),
    Animation(FileHandle),
    Document(FileHandle),
    Sticker(FileHandle),
    Location(GeoPoint),
}

/// An incoming chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: i64,
    pub chat_id: i64,
    pub from: User,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<TextEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caption_entities: Vec<TextEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl InboundMessage {
    /// A plain text message; handy for tests and synthesized answers.
    pub fn text(message_id: i64, chat_id: i64, from: User, text: impl Into<String>) -> Self {
        Self {
            message_id,
            chat_id,
            from,
            text: text.into(),
            entities: Vec::new(),
            caption: None,
            caption_entities: Vec::new(),
            attachment: None,
        }
    }

    /// Whether the text starts with a `/command`.
    pub fn is_command(&self) -> bool {
        self.text.starts_with('/') && self.text.len() > 1
    }

    /// Command name without the leading slash and the `@botname` suffix.
    pub fn command(&self) -> Option<&str> {
        if !self.is_command() {
            return None;
        }
        let head = self.text[1..].split_whitespace().next()?;
        Some(head.split('@').next().unwrap_or(head))
    }

    /// Everything after the command, trimmed.
    pub fn command_arguments(&self) -> &str {
        if !self.is_command() {
            return "";
        }
        match self.text.find(char::is_whitespace) {
            Some(pos) => self.text[pos..].trim(),
            None => "",
        }
    }
}

/// A pressed inline-keyboard button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    /// The message the keyboard was attached to, if still accessible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<InboundMessage>,
    #[serde(default)]
    pub data: String,
}

/// One inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Update {
    Message(InboundMessage),
    CallbackQuery(CallbackQuery),
}

impl Update {
    /// Numeric id of the user who caused the update.
    pub fn user_id(&self) -> i64 {
        match self {
            Update::Message(m) => m.from.id,
            Update::CallbackQuery(q) => q.from.id,
        }
    }
}
