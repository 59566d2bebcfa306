//! Line-oriented transport: every outbound operation becomes one JSON object
//! on its own line.
//!
//! ```json
//! {"send":{"chat_id":100,"text":"...","markup":{...}}}
//! {"answer_callback":{"callback_id":"q1","text":null}}
//! ```

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use formbot_core::transport::Transport;
use formbot_types::error::TransportError;
use formbot_types::reply::OutgoingMessage;

/// One line of output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundEvent<'a> {
    Send(&'a OutgoingMessage),
    AnswerCallback {
        callback_id: &'a str,
        text: Option<&'a str>,
    },
}

/// Writes outbound events as JSON lines to `W` (stdout in production).
pub struct JsonLinesTransport<W> {
    writer: Mutex<W>,
}

impl JsonLinesTransport<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> JsonLinesTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    async fn write_event(&self, event: &OutboundEvent<'_>) -> Result<(), TransportError> {
        let mut line = serde_json::to_vec(event)
            .map_err(|e| TransportError::Rejected(format!("unserializable event: {e}")))?;
        line.push(b'\n');

        // One lock per line keeps concurrent tasks from interleaving output.
        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))
    }
}

impl<W> Transport for JsonLinesTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        tracing::debug!(chat_id = message.chat_id, "sending message");
        self.write_event(&OutboundEvent::Send(&message)).await
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<String>,
    ) -> Result<(), TransportError> {
        self.write_event(&OutboundEvent::AnswerCallback {
            callback_id,
            text: text.as_deref(),
        })
        .await
    }
}
