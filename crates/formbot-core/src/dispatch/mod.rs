//! Update routing.
//!
//! Messages go to the first handler that accepts them, then to the sender's
//! live wizard, then to a default reply. Callback queries carrying the
//! wizard prefix go to the engine before any prefix-matched handler.
//!
//! Each update runs on its own task, tracked so shutdown can wait for the
//! work already accepted.

mod cancel;
mod handler;

use std::sync::Arc;

use tokio_util::task::TaskTracker;

use formbot_types::event::{CallbackQuery, InboundMessage, Update, User};

use crate::locale::{LocaleContext, Localizer, OptionsFetcher, RequestEnv};
use crate::wizard::callback::CALLBACK_DATA_FIELD_PREFIX;
use crate::wizard::{CallbackOutcome, FormEngine, ResumeOutcome};

pub use cancel::{CANCEL_SUCCESS_TR, CancelHandler, NO_ACTIVE_WIZARD_TR};
pub use handler::{CallbackHandler, MessageHandler};

pub const DEFAULT_MESSAGE_TR: &str = "commands.default.message";
pub const DEFAULT_MESSAGE_ON_COMMAND_TR: &str = "commands.default.message.on.command";

/// Where an update ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// A message handler with this name took it.
    Handler(String),
    Wizard(ResumeOutcome),
    /// Nobody wanted the message; the default reply was sent.
    Default,
    /// The wizard state could not be read; nothing was sent.
    StorageUnavailable,
    WizardCallback(CallbackOutcome),
    /// A callback handler with this prefix took it.
    CallbackHandler(String),
    /// No callback handler matched; the query was acknowledged.
    Unrouted,
}

pub struct Dispatcher {
    engine: Arc<FormEngine>,
    message_handlers: Vec<Arc<dyn MessageHandler>>,
    callback_handlers: Vec<Arc<dyn CallbackHandler>>,
    options: Arc<dyn OptionsFetcher>,
    localizer: Arc<dyn Localizer>,
    tracker: TaskTracker,
}

impl Dispatcher {
    /// Builds a dispatcher and registers the wizards among `message_handlers`.
    pub fn new(
        engine: Arc<FormEngine>,
        message_handlers: Vec<Arc<dyn MessageHandler>>,
        callback_handlers: Vec<Arc<dyn CallbackHandler>>,
        options: Arc<dyn OptionsFetcher>,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        engine.registry().populate(&message_handlers);
        Self {
            engine,
            message_handlers,
            callback_handlers,
            options,
            localizer,
            tracker: TaskTracker::new(),
        }
    }

    pub fn engine(&self) -> &Arc<FormEngine> {
        &self.engine
    }

    /// Processes `update` on a background task.
    pub fn handle_update(self: &Arc<Self>, update: Update) {
        let this = Arc::clone(self);
        self.tracker.spawn(async move {
            this.process_update(update).await;
        });
    }

    /// Processes `update` to completion, logging failures.
    pub async fn process_update(&self, update: Update) {
        let user_id = update.user_id();
        let result = match update {
            Update::Message(msg) => self.process_message(&msg).await,
            Update::CallbackQuery(query) => self.process_callback(&query).await,
        };
        match result {
            Ok(route) => tracing::debug!(user_id, ?route, "update processed"),
            Err(err) => tracing::error!(user_id, error = %format!("{err:#}"), "update failed"),
        }
    }

    pub async fn process_message(&self, msg: &InboundMessage) -> anyhow::Result<Route> {
        let env = self.request_env(&msg.from).await;

        if let Some(handler) = self
            .message_handlers
            .iter()
            .find(|h| h.can_handle(&env, msg))
        {
            tracing::debug!(handler = handler.name(), "message handler selected");
            handler.handle(&env, msg).await?;
            return Ok(Route::Handler(handler.name().to_string()));
        }

        match self.engine.resume(&env, msg).await {
            Ok(ResumeOutcome::NoActiveForm) => {}
            Ok(outcome) => return Ok(Route::Wizard(outcome)),
            Err(formbot_types::error::WizardError::Storage(err)) => {
                tracing::error!(user_id = msg.from.id, error = %err, "failed to read wizard state");
                return Ok(Route::StorageUnavailable);
            }
            Err(err) => return Err(err.into()),
        }

        let key = if msg.is_command() {
            DEFAULT_MESSAGE_ON_COMMAND_TR
        } else {
            DEFAULT_MESSAGE_TR
        };
        self.engine.replier().reply(msg, &env.lang.tr(key)).await?;
        Ok(Route::Default)
    }

    pub async fn process_callback(&self, query: &CallbackQuery) -> anyhow::Result<Route> {
        let env = self.request_env(&query.from).await;

        let Some((head, _)) = query.data.split_once(':') else {
            tracing::warn!(user_id = query.from.id, data = %query.data, "unexpected callback data");
            self.acknowledge(query).await;
            return Ok(Route::Unrouted);
        };
        let prefix = &query.data[..head.len() + 1];

        if prefix == CALLBACK_DATA_FIELD_PREFIX {
            match self.engine.handle_callback(&env, query).await? {
                CallbackOutcome::NotWizard => {
                    tracing::debug!(user_id = query.from.id, "wizard button without a live form");
                    self.acknowledge(query).await;
                    return Ok(Route::WizardCallback(CallbackOutcome::NotWizard));
                }
                outcome => return Ok(Route::WizardCallback(outcome)),
            }
        }

        if let Some(handler) = self.callback_handlers.iter().find(|h| h.prefix() == prefix) {
            handler.handle(&env, query).await?;
            return Ok(Route::CallbackHandler(prefix.to_string()));
        }

        tracing::warn!(user_id = query.from.id, %prefix, "no handler for callback prefix");
        self.acknowledge(query).await;
        Ok(Route::Unrouted)
    }

    /// Number of updates still being processed.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stops accepting updates and waits for the ones in flight.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("dispatcher drained");
    }

    async fn request_env(&self, user: &User) -> RequestEnv {
        let (locale, options) = self.options.fetch_user_options(user).await;
        RequestEnv::new(LocaleContext::new(locale, Arc::clone(&self.localizer)), options)
    }

    async fn acknowledge(&self, query: &CallbackQuery) {
        if let Err(err) = self.engine.replier().answer_callback(&query.id, None).await {
            tracing::warn!(
                user_id = query.from.id,
                error = %err,
                "failed to answer callback query"
            );
        }
    }
}
