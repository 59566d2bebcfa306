//! The form engine: advances a wizard one message at a time.
//!
//! Each call to [`FormEngine::process_next_field`] walks the form from its
//! cursor. Filled and skippable fields are passed over. A field that was
//! already asked consumes the incoming message as its answer. The first
//! field that was never asked is prompted, after the form has been saved.
//! When the cursor runs off the end the stored state is removed and the
//! completion action runs.

use std::sync::Arc;

use formbot_types::error::{RepositoryError, WizardError};
use formbot_types::event::InboundMessage;
use formbot_types::form::{FieldType, Form};
use formbot_types::reply::InlineButton;

use crate::locale::RequestEnv;
use crate::transport::Replier;

use super::callback::callback_data;
use super::descriptor::{ActionContext, FieldDescriptor, Keyboard};
use super::extract;
use super::form::Wizard;
use super::registry::WizardRegistry;
use super::storage::BoxStateStorage;
use super::validate::validate;

pub const INVALID_FIELD_VALUE_TR: &str = "wizard.errors.field.invalid.value";
pub const INVALID_FIELD_TYPE_TR: &str = "wizard.errors.field.invalid.type";
pub const MISSING_STATE_TR: &str = "wizard.errors.state.missing";
pub const STATE_SAVE_FAILED_TR: &str = "wizard.errors.state.save";

/// Where a form stopped after processing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// `field` was asked and the form was saved.
    Prompted { field: String },
    /// `field` had already been asked and is still waiting for its answer.
    Awaiting { field: String },
    /// The answer for `field` was refused; the cursor did not move.
    Rejected { field: String, reason: Rejection },
    /// All fields resolved and the completion action ran.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The message did not carry content of the field's type.
    WrongKind(FieldType),
    /// Validation failed with this translation key.
    Invalid(String),
}

/// Result of continuing a stored form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// The user has no live form.
    NoActiveForm,
    /// The stored form names a wizard type that is not registered. The
    /// stale state was removed.
    UnknownWizard(String),
    Advanced(Transition),
}

pub(crate) enum Answer {
    Accepted,
    Rejected(Rejection),
}

/// Drives wizards against a state storage and a transport.
pub struct FormEngine {
    registry: Arc<WizardRegistry>,
    storage: Arc<BoxStateStorage>,
    replier: Replier,
}

impl FormEngine {
    pub fn new(
        registry: Arc<WizardRegistry>,
        storage: Arc<BoxStateStorage>,
        replier: Replier,
    ) -> Self {
        Self {
            registry,
            storage,
            replier,
        }
    }

    pub fn registry(&self) -> &Arc<WizardRegistry> {
        &self.registry
    }

    pub fn storage(&self) -> &Arc<BoxStateStorage> {
        &self.storage
    }

    pub fn replier(&self) -> &Replier {
        &self.replier
    }

    /// Advances `wizard` with `msg`.
    ///
    /// Transport and storage failures are returned after the user has been
    /// told where possible. A `DescriptorMismatch` aborts the request.
    #[tracing::instrument(
        name = "process_next_field",
        skip_all,
        fields(user_id = msg.from.id, wizard_type = %wizard.form.wizard_type)
    )]
    pub async fn process_next_field(
        &self,
        env: &RequestEnv,
        msg: &InboundMessage,
        wizard: &mut Wizard,
    ) -> Result<Transition, WizardError> {
        self.advance(env, msg, wizard, true).await
    }

    /// Loads the stored form of the sender of `msg` and advances it.
    pub async fn resume(
        &self,
        env: &RequestEnv,
        msg: &InboundMessage,
    ) -> Result<ResumeOutcome, WizardError> {
        let user_id = msg.from.id;
        let Some(form) = self.storage.get_current_state(user_id).await? else {
            return Ok(ResumeOutcome::NoActiveForm);
        };

        let mut wizard = match self.restore(env, msg, form, true).await? {
            Ok(wizard) => wizard,
            Err(wizard_type) => return Ok(ResumeOutcome::UnknownWizard(wizard_type)),
        };
        let transition = self.process_next_field(env, msg, &mut wizard).await?;
        Ok(ResumeOutcome::Advanced(transition))
    }

    /// Drops the live form of `user_id`. Returns whether one existed.
    pub async fn cancel(&self, user_id: i64) -> Result<bool, RepositoryError> {
        match self.storage.delete_state(user_id).await {
            Ok(()) => {
                tracing::info!(user_id, "wizard cancelled");
                Ok(true)
            }
            Err(RepositoryError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Restores a stored form. An unregistered wizard type is reported to
    /// the user, its state discarded, and its name returned as `Err`.
    ///
    /// `answers_cursor` tells whether `msg` is the reply to the field under
    /// the cursor, which lets an `Auto` field take its type from it.
    pub(crate) async fn restore(
        &self,
        env: &RequestEnv,
        msg: &InboundMessage,
        form: Form,
        answers_cursor: bool,
    ) -> Result<Result<Wizard, String>, WizardError> {
        let answer = answers_cursor.then_some(msg);
        match Wizard::restore(form, &self.registry, answer) {
            Ok(wizard) => Ok(Ok(wizard)),
            Err(WizardError::NoSuchWizard(wizard_type)) => {
                tracing::warn!(
                    user_id = msg.from.id,
                    %wizard_type,
                    "stored form refers to an unregistered wizard"
                );
                self.replier.reply(msg, &env.lang.tr(MISSING_STATE_TR)).await?;
                if let Err(err) = self.cancel(msg.from.id).await {
                    tracing::warn!(
                        user_id = msg.from.id,
                        error = %err,
                        "failed to discard stale state"
                    );
                }
                Ok(Err(wizard_type))
            }
            Err(err) => Err(err),
        }
    }

    /// The loop behind `process_next_field`. With `accept_answer` off, a
    /// field that is already waiting for input is not fed `msg`.
    pub(crate) async fn advance(
        &self,
        env: &RequestEnv,
        msg: &InboundMessage,
        wizard: &mut Wizard,
        accept_answer: bool,
    ) -> Result<Transition, WizardError> {
        let descriptor = Arc::clone(&wizard.descriptor);
        loop {
            let index = wizard.form.index;
            let Some(field) = wizard.form.fields.get(index) else {
                return self.complete(env, msg, wizard).await;
            };
            let field_desc = Wizard::field_descriptor(&descriptor, &wizard.form, &field.name)?;

            if field.is_filled() || field_desc.should_skip(&wizard.form) {
                wizard.form.index += 1;
                continue;
            }

            if field.was_requested {
                let name = field.name.clone();
                if !accept_answer {
                    self.persist(env, msg, wizard).await?;
                    return Ok(Transition::Awaiting { field: name });
                }
                match self.accept(env, msg, wizard, index, field_desc).await? {
                    Answer::Accepted => {
                        tracing::debug!(field = %name, "field answered");
                        wizard.form.index += 1;
                        continue;
                    }
                    Answer::Rejected(reason) => {
                        if wizard.dirty {
                            self.persist(env, msg, wizard).await?;
                        }
                        return Ok(Transition::Rejected { field: name, reason });
                    }
                }
            }

            return self.ask(env, msg, wizard, index, field_desc).await;
        }
    }

    /// Extracts and validates the answer for field `index`, storing it on
    /// success. Rejections are replied to the user.
    pub(crate) async fn accept(
        &self,
        env: &RequestEnv,
        msg: &InboundMessage,
        wizard: &mut Wizard,
        index: usize,
        field_desc: &FieldDescriptor,
    ) -> Result<Answer, WizardError> {
        let declared = wizard.form.fields[index].field_type;
        let (resolved, value) = extract::extract(declared, msg);
        if declared.is_auto() {
            wizard.form.fields[index].field_type = resolved;
            wizard.dirty = true;
        }

        let Some(value) = value else {
            let text = env.lang.tr(INVALID_FIELD_TYPE_TR) + &env.lang.tr(resolved.as_str());
            self.replier.reply(msg, &text).await?;
            return Ok(Answer::Rejected(Rejection::WrongKind(resolved)));
        };

        if let Err(err) = validate(field_desc, env, msg, &wizard.form) {
            let text = env.lang.tr(INVALID_FIELD_VALUE_TR) + &env.lang.tr(err.key());
            self.replier.reply_markdown(msg, &text).await?;
            return Ok(Answer::Rejected(Rejection::Invalid(err.key().to_string())));
        }

        wizard.form.fields[index].value = Some(value);
        Ok(Answer::Accepted)
    }

    async fn ask(
        &self,
        env: &RequestEnv,
        msg: &InboundMessage,
        wizard: &mut Wizard,
        index: usize,
        field_desc: &FieldDescriptor,
    ) -> Result<Transition, WizardError> {
        wizard.form.fields[index].was_requested = true;
        if let Err(err) = self.persist(env, msg, wizard).await {
            wizard.form.fields[index].was_requested = false;
            return Err(err);
        }
        self.send_prompt(env, msg, &wizard.form, index, field_desc)
            .await?;
        Ok(Transition::Prompted {
            field: wizard.form.fields[index].name.clone(),
        })
    }

    async fn send_prompt(
        &self,
        env: &RequestEnv,
        msg: &InboundMessage,
        form: &Form,
        index: usize,
        field_desc: &FieldDescriptor,
    ) -> Result<(), WizardError> {
        let field = &form.fields[index];
        let mut prompt = env.lang.tr(field_desc.prompt_key());
        if prompt.is_empty() {
            tracing::warn!(field = %field.name, "empty prompt, asking with the field name");
            prompt = field.name.clone();
        }

        match field_desc.keyboard() {
            Keyboard::Reply(source) => {
                let options = source.resolve(env, msg, form);
                self.replier.reply_with_keyboard(msg, &prompt, &options).await?;
            }
            Keyboard::Inline(source) => {
                let buttons: Vec<InlineButton> = source
                    .resolve(env, msg, form)
                    .iter()
                    .map(|option| {
                        let mut button = InlineButton::callback(
                            env.lang.tr(option),
                            callback_data(&field.name, option),
                        );
                        if let Some(customize) = field_desc.inline_button_customizer(option) {
                            customize(&mut button, field);
                        }
                        button
                    })
                    .collect();
                self.replier
                    .reply_with_inline_keyboard(msg, &prompt, buttons)
                    .await?;
            }
            Keyboard::None => self.replier.reply(msg, &prompt).await?,
        }
        Ok(())
    }

    /// Saves the form. On failure the user is told and the storage error
    /// is returned.
    async fn persist(
        &self,
        env: &RequestEnv,
        msg: &InboundMessage,
        wizard: &mut Wizard,
    ) -> Result<(), WizardError> {
        let user_id = msg.from.id;
        match self.storage.save_state(user_id, &wizard.form).await {
            Ok(()) => {
                wizard.persisted = true;
                wizard.dirty = false;
                Ok(())
            }
            Err(err) => {
                tracing::error!(user_id, error = %err, "failed to save wizard state");
                let text = env.lang.tr(STATE_SAVE_FAILED_TR);
                if let Err(send_err) = self.replier.reply(msg, &text).await {
                    tracing::warn!(user_id, error = %send_err, "failed to report save failure");
                }
                Err(WizardError::Storage(err))
            }
        }
    }

    async fn complete(
        &self,
        env: &RequestEnv,
        msg: &InboundMessage,
        wizard: &mut Wizard,
    ) -> Result<Transition, WizardError> {
        let user_id = msg.from.id;
        if wizard.persisted {
            match self.storage.delete_state(user_id).await {
                Ok(()) | Err(RepositoryError::NotFound) => {}
                Err(err) => {
                    tracing::warn!(
                        user_id,
                        error = %err,
                        "failed to remove completed wizard state"
                    );
                }
            }
            wizard.persisted = false;
        }

        let action = Arc::clone(wizard.descriptor.action());
        let ctx = ActionContext {
            env: env.clone(),
            message: msg.clone(),
            fields: wizard.form.fields.clone(),
            replier: self.replier.clone(),
        };
        action(ctx)
            .await
            .map_err(|err| WizardError::Action(format!("{err:#}")))?;

        tracing::info!(user_id, wizard_type = %wizard.form.wizard_type, "wizard completed");
        Ok(Transition::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, StubWizard, user};
    use crate::wizard::skip::SkipOnFieldValue;
    use crate::wizard::validate::{VALID_ERR_NOT_IN_LIST_TR, ValidationError};
    use formbot_types::event::{Attachment, FileHandle};
    use formbot_types::form::FieldValue;
    use formbot_types::reply::{ButtonAction, ReplyMarkup};

    fn text(t: &str) -> InboundMessage {
        InboundMessage::text(10, 500, user(1), t)
    }

    fn two_text_fields() -> StubWizard {
        let mut stub = StubWizard::new("ProfileHandler", &["name", "bio"]);
        stub.configure("name", |f| {
            f.set_validator(|msg, _| {
                if msg.text.len() > 1 {
                    Ok(())
                } else {
                    Err(ValidationError::new("errors.too.short"))
                }
            });
        });
        stub
    }

    fn fresh(h: &Harness, stub: &StubWizard, fields: &[(&str, FieldType)]) -> Wizard {
        let mut wizard = Wizard::new(&h.registry, stub).unwrap();
        for (name, field_type) in fields {
            wizard.add_empty_field(name, *field_type).unwrap();
        }
        wizard
    }

    #[tokio::test]
    async fn test_happy_path_two_text_fields() {
        let stub = two_text_fields();
        let h = Harness::new(&stub);
        let mut wizard = fresh(&h, &stub, &[("name", FieldType::Text), ("bio", FieldType::Text)]);

        let t = h.engine.process_next_field(&h.env, &text("/profile"), &mut wizard).await.unwrap();
        assert_eq!(t, Transition::Prompted { field: "name".into() });
        assert_eq!(h.transport.texts(), vec!["NAME.PROMPT"]);
        let stored = h.storage.get(1).unwrap();
        assert!(stored.fields[0].was_requested);
        assert_eq!(stored.index, 0);

        let t = h.engine.resume(&h.env, &text("Ann")).await.unwrap();
        assert_eq!(t, ResumeOutcome::Advanced(Transition::Prompted { field: "bio".into() }));
        let stored = h.storage.get(1).unwrap();
        assert_eq!(stored.index, 1);
        assert_eq!(stored.fields[0].text(), Some("Ann"));

        let t = h.engine.resume(&h.env, &text("Hello")).await.unwrap();
        assert_eq!(t, ResumeOutcome::Advanced(Transition::Completed));
        assert!(h.storage.get(1).is_none());

        let completed = stub.completions();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].find("name").and_then(|f| f.text()), Some("Ann"));
        assert_eq!(completed[0].find("bio").and_then(|f| f.text()), Some("Hello"));
    }

    #[tokio::test]
    async fn test_validation_failure_keeps_cursor() {
        let stub = two_text_fields();
        let h = Harness::new(&stub);
        let mut wizard = fresh(&h, &stub, &[("name", FieldType::Text), ("bio", FieldType::Text)]);
        h.engine.process_next_field(&h.env, &text("/profile"), &mut wizard).await.unwrap();
        let before = h.storage.get(1).unwrap();

        let t = h.engine.resume(&h.env, &text("A")).await.unwrap();
        assert_eq!(
            t,
            ResumeOutcome::Advanced(Transition::Rejected {
                field: "name".into(),
                reason: Rejection::Invalid("errors.too.short".into()),
            })
        );
        let sent = h.transport.sent();
        let last = sent.last().unwrap();
        assert_eq!(last.text, "WIZARD.ERRORS.FIELD.INVALID.VALUEERRORS.TOO.SHORT");
        assert!(last.parse_mode.is_some());
        assert_eq!(h.storage.get(1).unwrap(), before);
        assert!(stub.completions().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_kind_is_rejected() {
        let stub = StubWizard::new("ProfileHandler", &["avatar"]);
        let h = Harness::new(&stub);
        let mut wizard = fresh(&h, &stub, &[("avatar", FieldType::Image)]);
        h.engine.process_next_field(&h.env, &text("/profile"), &mut wizard).await.unwrap();

        let t = h.engine.resume(&h.env, &text("not a photo")).await.unwrap();
        assert_eq!(
            t,
            ResumeOutcome::Advanced(Transition::Rejected {
                field: "avatar".into(),
                reason: Rejection::WrongKind(FieldType::Image),
            })
        );
        assert_eq!(
            h.transport.texts().last().map(String::as_str),
            Some("WIZARD.ERRORS.FIELD.INVALID.TYPEIMAGE")
        );
        assert_eq!(h.storage.get(1).unwrap().index, 0);
    }

    #[tokio::test]
    async fn test_skip_condition_passes_over_field() {
        let mut stub = StubWizard::new("ProfileHandler", &["role", "school", "bio"]);
        stub.configure("school", |f| {
            f.set_skip_condition(SkipOnFieldValue::new("role", "teacher"));
        });
        let h = Harness::new(&stub);
        let mut wizard = Wizard::new(&h.registry, &stub).unwrap();
        wizard.add_prefilled_field("role", "teacher").unwrap();
        wizard.add_empty_field("school", FieldType::Text).unwrap();
        wizard.add_empty_field("bio", FieldType::Text).unwrap();

        let t = h.engine.process_next_field(&h.env, &text("/profile"), &mut wizard).await.unwrap();
        assert_eq!(t, Transition::Prompted { field: "bio".into() });

        let stored = h.storage.get(1).unwrap();
        assert_eq!(stored.index, 2);
        assert!(!stored.fields[1].was_requested);
        assert!(stored.fields[1].value.is_none());
    }

    #[tokio::test]
    async fn test_consecutive_skips_in_one_pass() {
        let mut stub = StubWizard::new("ProfileHandler", &["role", "school", "grade", "bio"]);
        for name in ["school", "grade"] {
            stub.configure(name, |f| {
                f.set_skip_condition(SkipOnFieldValue::new("role", "teacher"));
            });
        }
        let h = Harness::new(&stub);
        let fields = [
            ("role", FieldType::Text),
            ("school", FieldType::Text),
            ("grade", FieldType::Text),
            ("bio", FieldType::Text),
        ];
        let mut wizard = fresh(&h, &stub, &fields);
        h.engine.process_next_field(&h.env, &text("/profile"), &mut wizard).await.unwrap();

        let t = h.engine.resume(&h.env, &text("teacher")).await.unwrap();
        assert_eq!(t, ResumeOutcome::Advanced(Transition::Prompted { field: "bio".into() }));
        let stored = h.storage.get(1).unwrap();
        assert_eq!(stored.index, 3);
        assert!(!stored.fields[1].was_requested);
        assert!(!stored.fields[2].was_requested);
        assert_eq!(h.transport.texts().last().map(String::as_str), Some("BIO.PROMPT"));
    }

    #[tokio::test]
    async fn test_trailing_skips_complete_the_form() {
        let mut stub = StubWizard::new("ProfileHandler", &["role", "school", "grade"]);
        for name in ["school", "grade"] {
            stub.configure(name, |f| {
                f.set_skip_condition(SkipOnFieldValue::new("role", "teacher"));
            });
        }
        let h = Harness::new(&stub);
        let fields = [
            ("role", FieldType::Text),
            ("school", FieldType::Text),
            ("grade", FieldType::Text),
        ];
        let mut wizard = fresh(&h, &stub, &fields);
        h.engine.process_next_field(&h.env, &text("/profile"), &mut wizard).await.unwrap();

        let t = h.engine.resume(&h.env, &text("teacher")).await.unwrap();
        assert_eq!(t, ResumeOutcome::Advanced(Transition::Completed));
        assert!(h.storage.get(1).is_none());
        let done = stub.completions();
        assert!(done[0].find("school").unwrap().value.is_none());
    }

    #[tokio::test]
    async fn test_empty_prompt_falls_back_to_field_name() {
        let mut stub = StubWizard::new("ProfileHandler", &["nickname"]);
        stub.configure("nickname", |f| *f = FieldDescriptor::new(""));
        let h = Harness::new(&stub);
        let mut wizard = fresh(&h, &stub, &[("nickname", FieldType::Text)]);

        let t = h.engine.process_next_field(&h.env, &text("/profile"), &mut wizard).await.unwrap();
        assert_eq!(t, Transition::Prompted { field: "nickname".into() });
        assert_eq!(h.transport.texts(), vec!["nickname"]);
    }

    #[tokio::test]
    async fn test_fully_prefilled_completes_without_storage() {
        let stub = StubWizard::new("ProfileHandler", &["name"]);
        let h = Harness::new(&stub);
        let mut wizard = Wizard::new(&h.registry, &stub).unwrap();
        wizard.add_prefilled_field("name", "Ann").unwrap();
        assert!(wizard.all_required_fields_filled());

        let t = h
            .engine
            .process_next_field(&h.env, &text("/profile Ann"), &mut wizard)
            .await
            .unwrap();
        assert_eq!(t, Transition::Completed);
        assert_eq!(h.storage.save_count(), 0);
        assert_eq!(h.storage.delete_count(), 0);
        assert_eq!(stub.completions().len(), 1);
    }

    #[tokio::test]
    async fn test_completed_state_is_removed_before_action() {
        let stub = StubWizard::new("ProfileHandler", &["name"]);
        let h = Harness::new(&stub);
        let storage = h.storage.clone();
        stub.on_complete(move || assert!(storage.get(1).is_none()));

        let mut wizard = fresh(&h, &stub, &[("name", FieldType::Text)]);
        h.engine.process_next_field(&h.env, &text("/profile"), &mut wizard).await.unwrap();
        let t = h.engine.resume(&h.env, &text("Ann")).await.unwrap();
        assert_eq!(t, ResumeOutcome::Advanced(Transition::Completed));
        assert_eq!(stub.completions().len(), 1);
    }

    #[tokio::test]
    async fn test_save_failure_suppresses_prompt() {
        let stub = StubWizard::new("ProfileHandler", &["name"]);
        let h = Harness::new(&stub);
        h.storage.fail_saves(true);
        let mut wizard = fresh(&h, &stub, &[("name", FieldType::Text)]);

        let err = h
            .engine
            .process_next_field(&h.env, &text("/profile"), &mut wizard)
            .await
            .unwrap_err();
        assert!(matches!(err, WizardError::Storage(_)));
        assert_eq!(h.transport.texts(), vec!["WIZARD.ERRORS.STATE.SAVE"]);
        assert!(!wizard.form().fields[0].was_requested);
    }

    #[tokio::test]
    async fn test_auto_field_type_is_fixed_on_first_answer() {
        let mut stub = StubWizard::new("ProfileHandler", &["avatar"]);
        stub.configure("avatar", |f| {
            f.set_validator(|_, _| Err(ValidationError::new("errors.nope")));
        });
        let h = Harness::new(&stub);
        let mut wizard = fresh(&h, &stub, &[("avatar", FieldType::Auto)]);
        h.engine.process_next_field(&h.env, &text("/profile"), &mut wizard).await.unwrap();

        let mut voice = text("");
        voice.attachment = Some(Attachment::Voice(FileHandle {
            file_id: "v".into(),
            file_unique_id: "vu".into(),
        }));
        let t = h.engine.resume(&h.env, &voice).await.unwrap();
        assert!(matches!(t, ResumeOutcome::Advanced(Transition::Rejected { .. })));
        // Rejected, but the detected type sticks.
        assert_eq!(h.storage.get(1).unwrap().fields[0].field_type, FieldType::Voice);

        let t = h.engine.resume(&h.env, &text("words")).await.unwrap();
        assert_eq!(
            t,
            ResumeOutcome::Advanced(Transition::Rejected {
                field: "avatar".into(),
                reason: Rejection::WrongKind(FieldType::Voice),
            })
        );
    }

    #[tokio::test]
    async fn test_reply_keyboard_prompt_and_membership() {
        let mut stub = StubWizard::new("ProfileHandler", &["role"]);
        stub.configure("role", |f| {
            f.set_reply_keyboard(["student", "teacher", "parent"]);
        });
        let h = Harness::with_buttons_per_row(&stub, 2);
        let mut wizard = fresh(&h, &stub, &[("role", FieldType::Text)]);
        h.engine.process_next_field(&h.env, &text("/profile"), &mut wizard).await.unwrap();

        let sent = h.transport.sent();
        match &sent[0].markup {
            ReplyMarkup::ReplyKeyboard { rows, .. } => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0], vec!["student".to_string(), "teacher".to_string()]);
            }
            other => panic!("expected a reply keyboard, got {other:?}"),
        }

        let t = h.engine.resume(&h.env, &text("pilot")).await.unwrap();
        assert_eq!(
            t,
            ResumeOutcome::Advanced(Transition::Rejected {
                field: "role".into(),
                reason: Rejection::Invalid(VALID_ERR_NOT_IN_LIST_TR.into()),
            })
        );
        let t = h.engine.resume(&h.env, &text("teacher")).await.unwrap();
        assert_eq!(t, ResumeOutcome::Advanced(Transition::Completed));
    }

    #[tokio::test]
    async fn test_inline_keyboard_prompt_uses_callback_data_and_customizer() {
        let mut stub = StubWizard::new("ProfileHandler", &["role"]);
        stub.configure("role", |f| {
            f.set_inline_keyboard(["student", "help"]);
            f.customize_inline_button("help", |btn, _| {
                btn.action = ButtonAction::Url("https://example.org/help".into());
            });
        });
        let h = Harness::new(&stub);
        let mut wizard = fresh(&h, &stub, &[("role", FieldType::Text)]);
        h.engine.process_next_field(&h.env, &text("/profile"), &mut wizard).await.unwrap();

        let sent = h.transport.sent();
        let ReplyMarkup::InlineKeyboard { rows } = &sent[0].markup else {
            panic!("expected an inline keyboard");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].text, "STUDENT");
        assert_eq!(rows[0][0].action, ButtonAction::CallbackData("wiz:role:student".into()));
        assert_eq!(rows[0][1].action, ButtonAction::Url("https://example.org/help".into()));
    }

    #[tokio::test]
    async fn test_filled_values_are_never_overwritten() {
        let stub = StubWizard::new("ProfileHandler", &["name", "bio"]);
        let h = Harness::new(&stub);
        let mut wizard = Wizard::new(&h.registry, &stub).unwrap();
        wizard.add_prefilled_field("name", "Ann").unwrap();
        wizard.add_empty_field("bio", FieldType::Text).unwrap();
        // Simulate a stale cursor.
        wizard.form.fields[0].was_requested = true;

        h.engine.process_next_field(&h.env, &text("Bob"), &mut wizard).await.unwrap();
        assert_eq!(
            wizard.form().fields[0].value,
            Some(FieldValue::text("Ann"))
        );
    }

    #[tokio::test]
    async fn test_index_stays_in_bounds() {
        let stub = two_text_fields();
        let h = Harness::new(&stub);
        let mut wizard = fresh(&h, &stub, &[("name", FieldType::Text), ("bio", FieldType::Text)]);
        h.engine.process_next_field(&h.env, &text("/profile"), &mut wizard).await.unwrap();
        for answer in ["x", "Ann", "y", "Bio"] {
            if let Some(form) = h.storage.get(1) {
                assert!(form.index <= form.fields.len());
                for field in form.fields.iter().take(form.index) {
                    assert!(field.is_filled());
                }
            }
            h.engine.resume(&h.env, &text(answer)).await.unwrap();
        }
        assert!(h.storage.get(1).is_none());
        assert_eq!(stub.completions().len(), 1);
    }

    #[tokio::test]
    async fn test_resume_without_state() {
        let stub = StubWizard::new("ProfileHandler", &["name"]);
        let h = Harness::new(&stub);
        let t = h.engine.resume(&h.env, &text("hello")).await.unwrap();
        assert_eq!(t, ResumeOutcome::NoActiveForm);
        assert!(h.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_resume_unknown_wizard_replies_and_discards() {
        let stub = StubWizard::new("ProfileHandler", &["name"]);
        let h = Harness::new(&stub);
        h.storage.put(1, Form::new("GhostWizard", 0));

        let t = h.engine.resume(&h.env, &text("hello")).await.unwrap();
        assert_eq!(t, ResumeOutcome::UnknownWizard("GhostWizard".into()));
        assert_eq!(h.transport.texts(), vec!["WIZARD.ERRORS.STATE.MISSING"]);
        assert!(h.storage.get(1).is_none());
    }

    #[tokio::test]
    async fn test_resume_descriptor_mismatch_is_fatal() {
        let stub = StubWizard::new("ProfileHandler", &["name"]);
        let h = Harness::new(&stub);
        let mut form = Form::new("ProfileWizard", 1);
        form.fields.push(formbot_types::form::Field::empty("age", FieldType::Text));
        h.storage.put(1, form);

        let err = h.engine.resume(&h.env, &text("hello")).await.unwrap_err();
        assert!(matches!(err, WizardError::DescriptorMismatch { .. }));
    }

    #[tokio::test]
    async fn test_cancel() {
        let stub = StubWizard::new("ProfileHandler", &["name"]);
        let h = Harness::new(&stub);
        h.storage.put(1, Form::new("ProfileWizard", 0));
        assert!(h.engine.cancel(1).await.unwrap());
        assert!(!h.engine.cancel(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_action_failure_is_reported() {
        let stub = StubWizard::new("ProfileHandler", &["name"]).failing();
        let h = Harness::new(&stub);
        let mut wizard = Wizard::new(&h.registry, &stub).unwrap();
        wizard.add_prefilled_field("name", "Ann").unwrap();

        let err = h
            .engine
            .process_next_field(&h.env, &text("/profile"), &mut wizard)
            .await
            .unwrap_err();
        assert!(matches!(err, WizardError::Action(msg) if msg.contains("action failed")));
    }
}
