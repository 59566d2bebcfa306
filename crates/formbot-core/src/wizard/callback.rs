//! Inline-button answers.
//!
//! Inline keyboard buttons of a wizard carry `wiz:<field>:<option>` as
//! callback data. Pressing one answers `<field>` with `<option>` exactly as
//! if the user had typed it, then continues the form.

use formbot_types::error::WizardError;
use formbot_types::event::{CallbackQuery, InboundMessage};

use crate::locale::RequestEnv;

use super::engine::{Answer, FormEngine, INVALID_FIELD_VALUE_TR, Transition};
use super::form::Wizard;

/// Callback data prefix that routes a button press to the wizard engine.
pub const CALLBACK_DATA_FIELD_PREFIX: &str = "wiz:";

/// Callback data for the button answering `field` with `option`.
pub fn callback_data(field: &str, option: &str) -> String {
    format!("{CALLBACK_DATA_FIELD_PREFIX}{field}:{option}")
}

/// Splits wizard callback data into `(field, option)`.
///
/// The field name ends at the first `:` after the prefix, so options may
/// contain colons but field names may not.
pub fn parse_callback_data(data: &str) -> Option<(&str, &str)> {
    let rest = data.strip_prefix(CALLBACK_DATA_FIELD_PREFIX)?;
    let (field, option) = rest.split_once(':')?;
    if field.is_empty() {
        return None;
    }
    Some((field, option))
}

/// What became of a callback query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The data is not a wizard answer, or the user has no live form.
    /// Another callback handler should take it.
    NotWizard,
    /// The button belongs to a field that is missing or already answered.
    Stale,
    UnknownWizard(String),
    Answered(Transition),
}

impl FormEngine {
    /// Applies an inline-button answer to the sender's live form.
    ///
    /// The query is acknowledged whenever it was recognised as a wizard
    /// answer, including when the answer is refused.
    #[tracing::instrument(name = "wizard_callback", skip_all, fields(user_id = query.from.id))]
    pub async fn handle_callback(
        &self,
        env: &RequestEnv,
        query: &CallbackQuery,
    ) -> Result<CallbackOutcome, WizardError> {
        let Some((field_name, option)) = parse_callback_data(&query.data) else {
            return Ok(CallbackOutcome::NotWizard);
        };
        let user_id = query.from.id;
        let form = match self.storage().get_current_state(user_id).await {
            Ok(Some(form)) => form,
            Ok(None) => return Ok(CallbackOutcome::NotWizard),
            Err(err) => {
                self.acknowledge(query).await;
                return Err(err.into());
            }
        };

        let msg = synthesize_message(query, option);
        let outcome = self.apply_callback(env, &msg, form, field_name).await;
        self.acknowledge(query).await;
        outcome
    }

    async fn acknowledge(&self, query: &CallbackQuery) {
        if let Err(err) = self.replier().answer_callback(&query.id, None).await {
            tracing::warn!(
                user_id = query.from.id,
                error = %err,
                "failed to answer callback query"
            );
        }
    }

    async fn apply_callback(
        &self,
        env: &RequestEnv,
        msg: &InboundMessage,
        form: formbot_types::form::Form,
        field_name: &str,
    ) -> Result<CallbackOutcome, WizardError> {
        // The synthesized text answers `field_name`, never the cursor field.
        let mut wizard = match self.restore(env, msg, form, false).await? {
            Ok(wizard) => wizard,
            Err(wizard_type) => return Ok(CallbackOutcome::UnknownWizard(wizard_type)),
        };

        let Some(index) = wizard.form.fields.position(field_name) else {
            tracing::warn!(field = %field_name, "callback for a field the form does not have");
            self.replier()
                .reply(msg, &env.lang.tr(INVALID_FIELD_VALUE_TR))
                .await?;
            return Ok(CallbackOutcome::Stale);
        };
        if wizard.form.fields[index].is_filled() {
            tracing::debug!(field = %field_name, "callback for an answered field");
            return Ok(CallbackOutcome::Stale);
        }

        let descriptor = std::sync::Arc::clone(&wizard.descriptor);
        let field_desc = Wizard::field_descriptor(&descriptor, &wizard.form, field_name)?;
        match self.accept(env, msg, &mut wizard, index, field_desc).await? {
            Answer::Rejected(reason) => Ok(CallbackOutcome::Answered(Transition::Rejected {
                field: field_name.to_string(),
                reason,
            })),
            Answer::Accepted => {
                let transition = self.advance(env, msg, &mut wizard, false).await?;
                Ok(CallbackOutcome::Answered(transition))
            }
        }
    }
}

/// A text message carrying `option`, addressed like the message the
/// keyboard was attached to. Without one, the private chat with the
/// sender is assumed.
fn synthesize_message(query: &CallbackQuery, option: &str) -> InboundMessage {
    let (message_id, chat_id) = match &query.message {
        Some(origin) => (origin.message_id, origin.chat_id),
        None => (0, query.from.id),
    };
    InboundMessage::text(message_id, chat_id, query.from.clone(), option)
}
