//! Messaging transport port.
//!
//! [`Transport`] is the outbound side of the bot: sending messages and
//! answering callback queries. It uses RPITIT, so [`BoxTransport`] provides
//! the type-erased form the engine stores, following the same blanket-impl
//! pattern as `BoxStateStorage`.
//!
//! [`Replier`] layers the reply helpers the wizard needs on top of it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use formbot_types::error::TransportError;
use formbot_types::event::InboundMessage;
use formbot_types::reply::{InlineButton, OutgoingMessage, ParseMode, ReplyMarkup};

/// Outbound messaging operations.
pub trait Transport: Send + Sync {
    /// Deliver a message to a chat.
    fn send(
        &self,
        message: OutgoingMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Acknowledge a callback query, optionally showing a short notice.
    fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<String>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Object-safe version of [`Transport`] with boxed futures.
pub trait TransportDyn: Send + Sync {
    fn send_boxed(
        &self,
        message: OutgoingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>>;

    fn answer_callback_boxed<'a>(
        &'a self,
        callback_id: &'a str,
        text: Option<String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>>;
}

impl<T: Transport> TransportDyn for T {
    fn send_boxed(
        &self,
        message: OutgoingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(self.send(message))
    }

    fn answer_callback_boxed<'a>(
        &'a self,
        callback_id: &'a str,
        text: Option<String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>> {
        Box::pin(self.answer_callback(callback_id, text))
    }
}

/// Type-erased transport.
pub struct BoxTransport {
    inner: Box<dyn TransportDyn + Send + Sync>,
}

impl BoxTransport {
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self {
            inner: Box::new(transport),
        }
    }

    pub async fn send(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        self.inner.send_boxed(message).await
    }

    pub async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<String>,
    ) -> Result<(), TransportError> {
        self.inner.answer_callback_boxed(callback_id, text).await
    }
}

/// Reply helpers bound to a transport and the keyboard layout settings.
#[derive(Clone)]
pub struct Replier {
    transport: Arc<BoxTransport>,
    buttons_per_row: usize,
}

impl Replier {
    pub fn new(transport: Arc<BoxTransport>, buttons_per_row: usize) -> Self {
        Self {
            transport,
            buttons_per_row: buttons_per_row.max(1),
        }
    }

    pub fn transport(&self) -> &Arc<BoxTransport> {
        &self.transport
    }

    pub fn buttons_per_row(&self) -> usize {
        self.buttons_per_row
    }

    /// Plain-text reply to `msg`.
    pub async fn reply(&self, msg: &InboundMessage, text: &str) -> Result<(), TransportError> {
        self.deliver(Self::reply_base(msg, text)).await
    }

    pub async fn reply_markdown(
        &self,
        msg: &InboundMessage,
        text: &str,
    ) -> Result<(), TransportError> {
        self.deliver(Self::reply_base(msg, text).with_parse_mode(ParseMode::Markdown))
            .await
    }

    /// Reply with a one-time reply keyboard built from `options`.
    ///
    /// An empty option list sends a plain reply.
    pub async fn reply_with_keyboard(
        &self,
        msg: &InboundMessage,
        text: &str,
        options: &[String],
    ) -> Result<(), TransportError> {
        let mut out = Self::reply_base(msg, text);
        if !options.is_empty() {
            out = out.with_markup(ReplyMarkup::ReplyKeyboard {
                rows: self.layout_rows(options),
                one_time: true,
                resize: true,
            });
        }
        self.deliver(out).await
    }

    /// Reply with an inline keyboard laid out as a single row.
    pub async fn reply_with_inline_keyboard(
        &self,
        msg: &InboundMessage,
        text: &str,
        buttons: Vec<InlineButton>,
    ) -> Result<(), TransportError> {
        let mut out = Self::reply_base(msg, text);
        if !buttons.is_empty() {
            out = out.with_markup(ReplyMarkup::InlineKeyboard {
                rows: vec![buttons],
            });
        }
        self.deliver(out).await
    }

    pub async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<String>,
    ) -> Result<(), TransportError> {
        self.transport.answer_callback(callback_id, text).await
    }

    /// Splits options into rows of at most `buttons_per_row`.
    pub fn layout_rows(&self, options: &[String]) -> Vec<Vec<String>> {
        options
            .chunks(self.buttons_per_row)
            .map(<[String]>::to_vec)
            .collect()
    }

    fn reply_base(msg: &InboundMessage, text: &str) -> OutgoingMessage {
        OutgoingMessage::new(msg.chat_id, text).reply_to(msg.message_id)
    }

    async fn deliver(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        if message.text.is_empty() {
            tracing::error!(chat_id = message.chat_id, "refusing to send an empty message");
            return Ok(());
        }
        self.transport.send(message).await
    }
}
