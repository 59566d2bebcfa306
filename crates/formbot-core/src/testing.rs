//! Test doubles shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;

use formbot_types::error::{RepositoryError, TransportError};
use formbot_types::event::{InboundMessage, User};
use formbot_types::form::{FieldType, Fields, Form};
use formbot_types::reply::OutgoingMessage;

use crate::dispatch::MessageHandler;
use crate::locale::{LocaleContext, Localizer, RequestEnv};
use crate::transport::{BoxTransport, Replier, Transport};
use crate::wizard::{
    BoxStateStorage, FieldDescriptor, FormDescriptor, FormEngine, StateStorage, Wizard,
    WizardHandler, WizardRegistry,
};

pub(crate) fn user(id: i64) -> User {
    User {
        id,
        language_code: Some("en".to_string()),
    }
}

/// Renders every key upper-cased, so tests can tell translated text apart.
pub(crate) struct UpperLocalizer;

impl Localizer for UpperLocalizer {
    fn tr(&self, _locale: &str, key: &str) -> String {
        key.to_uppercase()
    }
}

pub(crate) fn env() -> RequestEnv {
    RequestEnv::new(
        LocaleContext::new("en", Arc::new(UpperLocalizer)),
        serde_json::Value::Null,
    )
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryInner {
    forms: Mutex<HashMap<i64, Form>>,
    saves: AtomicUsize,
    deletes: AtomicUsize,
    fail_saves: AtomicBool,
    fail_reads: AtomicBool,
}

/// Map-backed storage with failure switches and call counters.
#[derive(Clone, Default)]
pub(crate) struct MemoryStorage {
    inner: Arc<MemoryInner>,
}

impl MemoryStorage {
    pub(crate) fn get(&self, user_id: i64) -> Option<Form> {
        self.inner.forms.lock().unwrap().get(&user_id).cloned()
    }

    pub(crate) fn put(&self, user_id: i64, form: Form) {
        self.inner.forms.lock().unwrap().insert(user_id, form);
    }

    pub(crate) fn save_count(&self) -> usize {
        self.inner.saves.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_count(&self) -> usize {
        self.inner.deletes.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_saves(&self, fail: bool) {
        self.inner.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }
}

impl StateStorage for MemoryStorage {
    async fn get_current_state(&self, user_id: i64) -> Result<Option<Form>, RepositoryError> {
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        Ok(self.get(user_id))
    }

    async fn save_state(&self, user_id: i64, form: &Form) -> Result<(), RepositoryError> {
        self.inner.saves.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk full".to_string()));
        }
        self.put(user_id, form.clone());
        Ok(())
    }

    async fn delete_state(&self, user_id: i64) -> Result<(), RepositoryError> {
        self.inner.deletes.fetch_add(1, Ordering::SeqCst);
        match self.inner.forms.lock().unwrap().remove(&user_id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn close(&self) {}
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Records everything sent through it.
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

// ---------------------------------------------------------------------------
// Wizards and handlers
// ---------------------------------------------------------------------------

type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct StubState {
    completions: Mutex<Vec<Fields>>,
    hook: Mutex<Option<Hook>>,
    failing: AtomicBool,
}

/// A wizard with text fields prompted by `<name>.prompt`, recording every
/// completion.
#[derive(Clone)]
pub(crate) struct StubWizard {
    id: String,
    fields: Vec<(String, FieldDescriptor)>,
    state: Arc<StubState>,
}

impl StubWizard {
    pub(crate) fn new(id: &str, names: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            fields: names
                .iter()
                .map(|n| (n.to_string(), FieldDescriptor::new(format!("{n}.prompt"))))
                .collect(),
            state: Arc::default(),
        }
    }

    pub(crate) fn configure(&mut self, name: &str, f: impl FnOnce(&mut FieldDescriptor)) {
        if let Some((_, desc)) = self.fields.iter_mut().find(|(n, _)| n == name) {
            f(desc);
        }
    }

    /// The completion action fails.
    pub(crate) fn failing(self) -> Self {
        self.state.failing.store(true, Ordering::SeqCst);
        self
    }

    /// Runs `f` at the start of every completion.
    pub(crate) fn on_complete(&self, f: impl Fn() + Send + Sync + 'static) {
        *self.state.hook.lock().unwrap() = Some(Box::new(f));
    }

    pub(crate) fn completions(&self) -> Vec<Fields> {
        self.state.completions.lock().unwrap().clone()
    }

    /// A `/start_wizard` handler asking every field as text.
    pub(crate) fn starting(self, engine: Arc<FormEngine>) -> StartingWizard {
        StartingWizard { stub: self, engine }
    }
}

impl WizardHandler for StubWizard {
    fn wizard_id(&self) -> &str {
        &self.id
    }

    fn wizard_descriptor(&self) -> FormDescriptor {
        let state = Arc::clone(&self.state);
        let mut desc = FormDescriptor::new(move |ctx| {
            let state = Arc::clone(&state);
            async move {
                if let Some(hook) = state.hook.lock().unwrap().as_ref() {
                    hook();
                }
                if state.failing.load(Ordering::SeqCst) {
                    anyhow::bail!("action failed");
                }
                state.completions.lock().unwrap().push(ctx.fields);
                Ok(())
            }
        });
        for (name, field) in &self.fields {
            *desc.add_field(name.as_str(), field.prompt_key()) = field.clone();
        }
        desc
    }
}

impl MessageHandler for StubWizard {
    fn name(&self) -> &str {
        &self.id
    }

    fn can_handle(&self, _env: &RequestEnv, _msg: &InboundMessage) -> bool {
        false
    }

    fn handle<'a>(
        &'a self,
        _env: &'a RequestEnv,
        _msg: &'a InboundMessage,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn as_wizard(&self) -> Option<&dyn WizardHandler> {
        Some(self)
    }
}

pub(crate) struct StartingWizard {
    stub: StubWizard,
    engine: Arc<FormEngine>,
}

impl MessageHandler for StartingWizard {
    fn name(&self) -> &str {
        &self.stub.id
    }

    fn can_handle(&self, _env: &RequestEnv, msg: &InboundMessage) -> bool {
        msg.command() == Some("start_wizard")
    }

    fn handle<'a>(
        &'a self,
        env: &'a RequestEnv,
        msg: &'a InboundMessage,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let mut wizard = Wizard::new(self.engine.registry(), &self.stub)?;
            for (name, _) in &self.stub.fields {
                wizard.add_empty_field(name, FieldType::Text)?;
            }
            self.engine.process_next_field(env, msg, &mut wizard).await?;
            Ok(())
        })
    }

    fn as_wizard(&self) -> Option<&dyn WizardHandler> {
        Some(&self.stub)
    }
}

/// `/echo <text>` replies with `<text>`.
#[derive(Default)]
pub(crate) struct EchoHandler {
    replier: Option<Replier>,
}

impl EchoHandler {
    pub(crate) fn with_replier(replier: Replier) -> Self {
        Self {
            replier: Some(replier),
        }
    }
}

impl MessageHandler for EchoHandler {
    fn name(&self) -> &str {
        "EchoHandler"
    }

    fn can_handle(&self, _env: &RequestEnv, msg: &InboundMessage) -> bool {
        msg.command() == Some("echo")
    }

    fn handle<'a>(
        &'a self,
        _env: &'a RequestEnv,
        msg: &'a InboundMessage,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            if let Some(replier) = &self.replier {
                replier.reply(msg, msg.command_arguments()).await?;
            }
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// An engine wired to in-memory doubles.
pub(crate) struct Harness {
    pub(crate) registry: Arc<WizardRegistry>,
    pub(crate) storage: MemoryStorage,
    pub(crate) transport: RecordingTransport,
    pub(crate) engine: Arc<FormEngine>,
    pub(crate) env: RequestEnv,
}

impl Harness {
    /// Registry populated with `stub` only.
    pub(crate) fn new(stub: &StubWizard) -> Self {
        Self::with_buttons_per_row(stub, 6)
    }

    pub(crate) fn with_buttons_per_row(stub: &StubWizard, buttons_per_row: usize) -> Self {
        let harness = Self::build(buttons_per_row);
        harness.registry.populate_wizards([stub as &dyn WizardHandler]);
        harness
    }

    /// Registry left empty, for callers that populate it themselves.
    pub(crate) fn unpopulated() -> Self {
        Self::build(6)
    }

    fn build(buttons_per_row: usize) -> Self {
        let registry = Arc::new(WizardRegistry::new());
        let storage = MemoryStorage::default();
        let transport = RecordingTransport::default();
        let replier = Replier::new(Arc::new(BoxTransport::new(transport.clone())), buttons_per_row);
        let engine = Arc::new(FormEngine::new(
            Arc::clone(&registry),
            Arc::new(BoxStateStorage::new(storage.clone())),
            replier,
        ));
        Self {
            registry,
            storage,
            transport,
            engine,
            env: env(),
        }
    }
}
