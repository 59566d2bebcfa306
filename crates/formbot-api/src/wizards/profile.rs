//! `/profile [name]`: collects a short user profile.
//!
//! Fields, in order:
//! - `name`: text, prefilled from the command arguments when given
//! - `role`: inline keyboard, `student` or `teacher`
//! - `school`: text, skipped for teachers
//! - `avatar`: any media, type taken from the first answer
//! - `location`: a shared map location

use std::fmt::Write as _;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use formbot_core::dispatch::MessageHandler;
use formbot_core::locale::RequestEnv;
use formbot_core::wizard::{
    ActionContext, FormDescriptor, FormEngine, SkipOnFieldValue, ValidationError, WizardHandler,
};
use formbot_types::event::InboundMessage;
use formbot_types::form::{FieldType, FieldValue, Fields};

pub const ROLE_STUDENT: &str = "student";
pub const ROLE_TEACHER: &str = "teacher";

const NAME_MAX_CHARS: usize = 64;
const NAME_TOO_LONG_TR: &str = "profile.errors.name.length";
const DONE_TR: &str = "profile.done";

pub struct ProfileHandler {
    engine: Arc<FormEngine>,
}

impl ProfileHandler {
    pub fn new(engine: Arc<FormEngine>) -> Self {
        Self { engine }
    }
}

impl WizardHandler for ProfileHandler {
    fn wizard_id(&self) -> &str {
        "ProfileHandler"
    }

    fn wizard_descriptor(&self) -> FormDescriptor {
        let mut desc = FormDescriptor::new(complete_profile);

        desc.add_field("name", "profile.prompts.name")
            .set_validator(|msg, _lang| {
                if msg.text.trim().chars().count() > NAME_MAX_CHARS {
                    return Err(ValidationError::new(NAME_TOO_LONG_TR));
                }
                Ok(())
            });
        desc.add_field("role", "profile.prompts.role")
            .set_inline_keyboard([ROLE_STUDENT, ROLE_TEACHER]);
        desc.add_field("school", "profile.prompts.school")
            .set_skip_condition(SkipOnFieldValue::new("role", ROLE_TEACHER));
        desc.add_field("avatar", "profile.prompts.avatar");
        desc.add_field("location", "profile.prompts.location");

        desc
    }
}

impl MessageHandler for ProfileHandler {
    fn name(&self) -> &str {
        self.wizard_id()
    }

    fn can_handle(&self, _env: &RequestEnv, msg: &InboundMessage) -> bool {
        msg.command() == Some("profile")
    }

    fn handle<'a>(
        &'a self,
        env: &'a RequestEnv,
        msg: &'a InboundMessage,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let mut wizard = self.engine.registry().new_wizard(self)?;

            let name = msg.command_arguments();
            if name.is_empty() {
                wizard.add_empty_field("name", FieldType::Text)?;
            } else {
                wizard.add_prefilled_field("name", name)?;
            }
            wizard
                .add_empty_field("role", FieldType::Text)?
                .add_empty_field("school", FieldType::Text)?
                .add_empty_field("avatar", FieldType::Auto)?
                .add_empty_field("location", FieldType::Location)?;

            let transition = self.engine.process_next_field(env, msg, &mut wizard).await?;
            tracing::debug!(user_id = msg.from.id, ?transition, "profile wizard started");
            Ok(())
        })
    }

    fn as_wizard(&self) -> Option<&dyn WizardHandler> {
        Some(self)
    }
}

async fn complete_profile(ctx: ActionContext) -> anyhow::Result<()> {
    let summary = summarize(&ctx.env, &ctx.fields);
    tracing::info!(user_id = ctx.message.from.id, "profile collected");
    ctx.replier.reply_markdown(&ctx.message, &summary).await?;
    Ok(())
}

/// Markdown summary of a completed profile.
pub fn summarize(env: &RequestEnv, fields: &Fields) -> String {
    let mut out = env.lang.tr(DONE_TR);
    for field in fields.iter() {
        let rendered = match &field.value {
            None => continue,
            Some(FieldValue::Text(text)) if field.name == "role" => env.lang.tr(&text.text),
            Some(FieldValue::Text(text)) => text.text.clone(),
            Some(FieldValue::File(file)) => format!("{} `{}`", field.field_type, file.id),
            Some(FieldValue::Location(point)) => format!("{:.5}, {:.5}", point.lat, point.lon),
        };
        let label = env.lang.tr(&format!("profile.fields.{}", field.name));
        let _ = write!(out, "\n*{label}*: {rendered}");
    }
    out
}
