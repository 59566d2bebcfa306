//! Conditions under which a field is not asked.

use formbot_types::form::Form;

/// Decides from the rest of the form whether a field should be skipped.
pub trait SkipCondition: Send + Sync {
    fn should_skip(&self, form: &Form) -> bool;
}

/// Skips when another field holds exactly `value` as text.
#[derive(Debug, Clone)]
pub struct SkipOnFieldValue {
    pub name: String,
    pub value: String,
}

impl SkipOnFieldValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl SkipCondition for SkipOnFieldValue {
    fn should_skip(&self, form: &Form) -> bool {
        match form.fields.find(&self.name) {
            Some(field) => field.text() == Some(self.value.as_str()),
            None => {
                tracing::warn!(
                    wizard_type = %form.wizard_type,
                    field = %self.name,
                    "skip condition refers to a missing field"
                );
                false
            }
        }
    }
}

/// Skips when another field already has a value.
#[derive(Debug, Clone)]
pub struct SkipIfFieldFilled {
    pub name: String,
}

impl SkipIfFieldFilled {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl SkipCondition for SkipIfFieldFilled {
    fn should_skip(&self, form: &Form) -> bool {
        match form.fields.find(&self.name) {
            Some(field) => field.is_filled(),
            None => {
                tracing::warn!(
                    wizard_type = %form.wizard_type,
                    field = %self.name,
                    "skip condition refers to a missing field"
                );
                false
            }
        }
    }
}
