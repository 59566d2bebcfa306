//! Answer validation.

use std::fmt;

use formbot_types::event::InboundMessage;
use formbot_types::form::Form;

use crate::locale::RequestEnv;

use super::descriptor::{FieldDescriptor, Keyboard};

/// Translation key reported when an answer is not one of the keyboard options.
pub const VALID_ERR_NOT_IN_LIST_TR: &str = "errors.validation.option.not.in.list";

/// A rejected answer, identified by the translation key of its explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    key: String,
}

impl ValidationError {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl std::error::Error for ValidationError {}

/// Checks an answer against the keyboard options and the custom validator.
///
/// Keyboard membership is checked first; when it fails the custom validator
/// is not consulted. An option matches either verbatim or in its rendering
/// for the current locale.
pub fn validate(
    descriptor: &FieldDescriptor,
    env: &RequestEnv,
    msg: &InboundMessage,
    form: &Form,
) -> Result<(), ValidationError> {
    if descriptor.keyboard_validation() {
        let source = match descriptor.keyboard() {
            Keyboard::Reply(source) | Keyboard::Inline(source) => Some(source),
            Keyboard::None => None,
        };
        if let Some(source) = source {
            let options = source.resolve(env, msg, form);
            let answer = msg.text.as_str();
            let listed = options
                .iter()
                .any(|opt| opt == answer || env.lang.tr(opt) == answer);
            if !listed {
                return Err(ValidationError::new(VALID_ERR_NOT_IN_LIST_TR));
            }
        }
    }

    match descriptor.validator() {
        Some(validator) => validator(msg, &env.lang),
        None => Ok(()),
    }
}
