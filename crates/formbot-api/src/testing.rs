//! Test doubles for the binary's unit tests.

use std::sync::{Arc, Mutex};

use formbot_core::transport::{BoxTransport, Transport};
use formbot_core::wizard::BoxStateStorage;
use formbot_types::config::{AppConfig, StorageBackend};
use formbot_types::error::TransportError;
use formbot_types::event::Update;
use formbot_types::reply::OutgoingMessage;

use crate::state::AppState;

#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    sent: Arc<Mutex<Vec<OutgoingMessage>>>,
    answers: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl RecordingTransport {
    pub(crate) fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    pub(crate) fn answers(&self) -> Vec<(String, Option<String>)> {
        self.answers.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    async fn send(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<String>,
    ) -> Result<(), TransportError> {
        self.answers
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text));
        Ok(())
    }
}

/// A fully wired application on in-memory storage, without catalogs, so
/// every reply is its raw translation key.
pub(crate) struct Bot {
    pub(crate) state: AppState,
    pub(crate) storage: Arc<BoxStateStorage>,
    _data_dir: tempfile::TempDir,
}

impl Bot {
    pub(crate) async fn memory(transport: RecordingTransport) -> Self {
        let data_dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Memory;

        let state = AppState::init(
            config,
            data_dir.path().to_path_buf(),
            BoxTransport::new(transport),
        )
        .await
        .unwrap();
        let storage = Arc::clone(state.dispatcher.engine().storage());

        Self {
            state,
            storage,
            _data_dir: data_dir,
        }
    }

    /// Processes one update to completion.
    pub(crate) async fn process(&self, update: Update) {
        self.state.dispatcher.process_update(update).await;
    }
}
