//! Static description of a wizard: its fields and its completion action.
//!
//! Descriptors are built once per wizard type at startup and shared through
//! the [`WizardRegistry`](super::registry::WizardRegistry). They never change
//! afterwards and are never persisted.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use formbot_types::event::InboundMessage;
use formbot_types::form::{Field, Fields, Form};
use formbot_types::reply::InlineButton;

use crate::locale::{LocaleContext, RequestEnv};
use crate::transport::Replier;

use super::skip::SkipCondition;
use super::validate::ValidationError;

/// Everything a completion action receives.
pub struct ActionContext {
    pub env: RequestEnv,
    /// The message that completed the form.
    pub message: InboundMessage,
    pub fields: Fields,
    pub replier: Replier,
}

/// Runs once when every field of a form is resolved.
pub type FormAction =
    Arc<dyn Fn(ActionContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Custom check on the answer to a field.
pub type FieldValidator =
    Arc<dyn Fn(&InboundMessage, &LocaleContext) -> Result<(), ValidationError> + Send + Sync>;

/// Computes keyboard options at prompt time.
pub type OptionsBuilder =
    Arc<dyn Fn(&RequestEnv, &InboundMessage, &Form) -> Vec<String> + Send + Sync>;

/// Adjusts the inline button generated for one option.
pub type InlineButtonCustomizer = Arc<dyn Fn(&mut InlineButton, &Field) + Send + Sync>;

/// Where keyboard options come from.
#[derive(Clone)]
pub enum OptionSource {
    Fixed(Vec<String>),
    Built(OptionsBuilder),
}

impl OptionSource {
    pub fn resolve(&self, env: &RequestEnv, msg: &InboundMessage, form: &Form) -> Vec<String> {
        match self {
            OptionSource::Fixed(options) => options.clone(),
            OptionSource::Built(builder) => builder(env, msg, form),
        }
    }
}

/// The keyboard shown with a prompt. A field has at most one.
#[derive(Clone, Default)]
pub enum Keyboard {
    #[default]
    None,
    Reply(OptionSource),
    Inline(OptionSource),
}

/// Per-field behaviour: prompt, keyboard, validation, and skip condition.
#[derive(Clone)]
pub struct FieldDescriptor {
    prompt_key: String,
    validator: Option<FieldValidator>,
    skip_condition: Option<Arc<dyn SkipCondition>>,
    keyboard: Keyboard,
    keyboard_validation: bool,
    inline_button_customizers: HashMap<String, InlineButtonCustomizer>,
}

impl FieldDescriptor {
    pub fn new(prompt_key: impl Into<String>) -> Self {
        Self {
            prompt_key: prompt_key.into(),
            validator: None,
            skip_condition: None,
            keyboard: Keyboard::None,
            keyboard_validation: true,
            inline_button_customizers: HashMap::new(),
        }
    }

    /// Translation key of the question asked for this field.
    pub fn prompt_key(&self) -> &str {
        &self.prompt_key
    }

    pub fn validator(&self) -> Option<&FieldValidator> {
        self.validator.as_ref()
    }

    pub fn skip_condition(&self) -> Option<&dyn SkipCondition> {
        self.skip_condition.as_deref()
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    /// Whether answers must be one of the keyboard options.
    pub fn keyboard_validation(&self) -> bool {
        self.keyboard_validation
    }

    pub fn inline_button_customizer(&self, option: &str) -> Option<&InlineButtonCustomizer> {
        self.inline_button_customizers.get(option)
    }

    /// Whether the field should be skipped given the rest of the form.
    pub fn should_skip(&self, form: &Form) -> bool {
        self.skip_condition
            .as_ref()
            .is_some_and(|cond| cond.should_skip(form))
    }

    pub fn set_validator<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&InboundMessage, &LocaleContext) -> Result<(), ValidationError>
            + Send
            + Sync
            + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    pub fn set_skip_condition(&mut self, condition: impl SkipCondition + 'static) -> &mut Self {
        self.skip_condition = Some(Arc::new(condition));
        self
    }

    /// Reply keyboard with fixed options. Replaces any inline keyboard.
    pub fn set_reply_keyboard<I, S>(&mut self, options: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keyboard = Keyboard::Reply(OptionSource::Fixed(
            options.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn set_reply_keyboard_builder<F>(&mut self, builder: F) -> &mut Self
    where
        F: Fn(&RequestEnv, &InboundMessage, &Form) -> Vec<String> + Send + Sync + 'static,
    {
        self.keyboard = Keyboard::Reply(OptionSource::Built(Arc::new(builder)));
        self
    }

    /// Inline keyboard with fixed options. Replaces any reply keyboard.
    pub fn set_inline_keyboard<I, S>(&mut self, options: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keyboard = Keyboard::Inline(OptionSource::Fixed(
            options.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn set_inline_keyboard_builder<F>(&mut self, builder: F) -> &mut Self
    where
        F: Fn(&RequestEnv, &InboundMessage, &Form) -> Vec<String> + Send + Sync + 'static,
    {
        self.keyboard = Keyboard::Inline(OptionSource::Built(Arc::new(builder)));
        self
    }

    /// Accept free-form answers even though a keyboard is shown.
    pub fn disable_keyboard_validation(&mut self) -> &mut Self {
        self.keyboard_validation = false;
        self
    }

    /// Installs a customizer for the button of `option`.
    ///
    /// Returns `false` and keeps the existing one if `option` already has a
    /// customizer.
    pub fn customize_inline_button<F>(&mut self, option: impl Into<String>, f: F) -> bool
    where
        F: Fn(&mut InlineButton, &Field) + Send + Sync + 'static,
    {
        use std::collections::hash_map::Entry;

        match self.inline_button_customizers.entry(option.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(f));
                true
            }
        }
    }
}

/// Fields and completion action of one wizard type.
pub struct FormDescriptor {
    action: FormAction,
    fields: HashMap<String, FieldDescriptor>,
}

impl FormDescriptor {
    /// A descriptor whose completion runs `action`.
    pub fn new<F, Fut>(action: F) -> Self
    where
        F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            action: Arc::new(move |ctx| Box::pin(action(ctx))),
            fields: HashMap::new(),
        }
    }

    /// Declares a field. Declaring the same name again replaces the earlier
    /// descriptor.
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        prompt_key: impl Into<String>,
    ) -> &mut FieldDescriptor {
        use std::collections::hash_map::Entry;

        let descriptor = FieldDescriptor::new(prompt_key);
        match self.fields.entry(name.into()) {
            Entry::Occupied(mut slot) => {
                tracing::debug!(
                    field = %slot.key(),
                    "field descriptor redeclared, keeping the last one"
                );
                slot.insert(descriptor);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(descriptor),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldDescriptor> {
        self.fields.get_mut(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn action(&self) -> &FormAction {
        &self.action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::skip::SkipIfFieldFilled;
    use formbot_types::form::{FieldType, FieldValue};
    use formbot_types::reply::ButtonAction;

    fn noop() -> FormDescriptor {
        FormDescriptor::new(|_ctx| async { Ok(()) })
    }

    #[test]
    fn test_add_field_last_declaration_wins() {
        let mut desc = noop();
        desc.add_field("name", "first.prompt");
        desc.add_field("name", "second.prompt");
        assert_eq!(desc.field("name").unwrap().prompt_key(), "second.prompt");
    }

    #[test]
    fn test_keyboards_are_exclusive() {
        let mut desc = noop();
        let field = desc.add_field("role", "role.prompt");
        field.set_reply_keyboard(["a", "b"]);
        assert!(matches!(field.keyboard(), Keyboard::Reply(_)));
        field.set_inline_keyboard(["c"]);
        assert!(matches!(
            field.keyboard(),
            Keyboard::Inline(OptionSource::Fixed(o)) if o == &["c"]
        ));
    }

    #[test]
    fn test_customize_inline_button_keeps_first() {
        let mut field = FieldDescriptor::new("p");
        assert!(field.customize_inline_button("web", |btn, _| {
            btn.action = ButtonAction::Url("https://example.org".to_string());
        }));
        assert!(!field.customize_inline_button("web", |_, _| {}));

        let mut btn = InlineButton::callback("web", "wiz:f:web");
        let customizer = field.inline_button_customizer("web").unwrap();
        customizer(&mut btn, &Field::empty("f", FieldType::Text));
        assert_eq!(btn.action, ButtonAction::Url("https://example.org".to_string()));
        assert!(field.inline_button_customizer("other").is_none());
    }

    #[test]
    fn test_should_skip_uses_condition() {
        let mut field = FieldDescriptor::new("p");
        let mut form = Form::new("W", 1);
        form.fields.push(Field::prefilled("x", FieldValue::text("1")));
        assert!(!field.should_skip(&form));
        field.set_skip_condition(SkipIfFieldFilled::new("x"));
        assert!(field.should_skip(&form));
    }

    #[test]
    fn test_keyboard_validation_defaults_on() {
        let mut field = FieldDescriptor::new("p");
        assert!(field.keyboard_validation());
        field.disable_keyboard_validation();
        assert!(!field.keyboard_validation());
    }
}
