//! Outgoing messages handed to the transport.

use serde::{Deserialize, Serialize};

/// How the transport should interpret markup in `text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    Markdown,
    Html,
}

/// What happens when an inline button is pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    /// Sends a callback query with this data back to the bot.
    CallbackData(String),
    Url(String),
    /// Opens inline mode in another chat with the given query.
    SwitchInlineQuery(String),
    /// Opens inline mode in the current chat with the given query.
    SwitchInlineQueryCurrentChat(String),
}

/// A button of an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub action: ButtonAction,
}

impl InlineButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::CallbackData(data.into()),
        }
    }
}

/// Keyboard attached to an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyMarkup {
    #[default]
    None,
    /// Custom keyboard replacing the user's input keyboard.
    ReplyKeyboard {
        rows: Vec<Vec<String>>,
        one_time: bool,
        resize: bool,
    },
    /// Buttons attached to the message itself.
    InlineKeyboard { rows: Vec<Vec<InlineButton>> },
}

/// A message to be sent to a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(default)]
    pub markup: ReplyMarkup,
}

impl OutgoingMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            reply_to_message_id: None,
            text: text.into(),
            parse_mode: None,
            markup: ReplyMarkup::None,
        }
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn with_markup(mut self, markup: ReplyMarkup) -> Self {
        self.markup = markup;
        self
    }
}
