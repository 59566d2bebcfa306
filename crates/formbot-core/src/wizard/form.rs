//! A form bound to its descriptor.

use std::sync::Arc;

use formbot_types::error::WizardError;
use formbot_types::event::InboundMessage;
use formbot_types::form::{Field, FieldType, FieldValue, Form};

use super::descriptor::{FieldDescriptor, FormDescriptor};
use super::extract::{self, detect_field_type};
use super::registry::{WizardHandler, WizardRegistry};

/// A live wizard: persisted [`Form`] data plus the behaviour looked up from
/// the registry.
pub struct Wizard {
    pub(crate) form: Form,
    pub(crate) descriptor: Arc<FormDescriptor>,
    /// A stored copy exists and must be removed on completion.
    pub(crate) persisted: bool,
    /// The form changed since it was loaded and should be saved even if the
    /// current answer is rejected.
    pub(crate) dirty: bool,
}

impl Wizard {
    /// Starts an empty wizard for `handler`.
    pub fn new(
        registry: &WizardRegistry,
        handler: &dyn WizardHandler,
    ) -> Result<Self, WizardError> {
        let Some(wizard_type) = registry.type_name(handler.wizard_id()) else {
            return Err(WizardError::NoSuchWizard(handler.wizard_type()));
        };
        let descriptor = registry
            .get(wizard_type)
            .ok_or_else(|| WizardError::NoSuchWizard(wizard_type.to_string()))?;
        Ok(Self::with_descriptor(wizard_type, descriptor))
    }

    pub fn with_descriptor(
        wizard_type: impl Into<String>,
        descriptor: Arc<FormDescriptor>,
    ) -> Self {
        Self {
            form: Form::new(wizard_type, 0),
            descriptor,
            persisted: false,
            dirty: false,
        }
    }

    /// Rebinds a stored form to its descriptor.
    ///
    /// Every stored field must still be declared. If the field under the
    /// cursor was asked with type `Auto` and `answer` is the user's reply to
    /// it, the field's type is fixed from `answer`.
    pub fn restore(
        form: Form,
        registry: &WizardRegistry,
        answer: Option<&InboundMessage>,
    ) -> Result<Self, WizardError> {
        let descriptor = registry
            .get(&form.wizard_type)
            .ok_or_else(|| WizardError::NoSuchWizard(form.wizard_type.clone()))?;

        if let Some(field) = form.fields.iter().find(|f| !descriptor.has_field(&f.name)) {
            return Err(WizardError::DescriptorMismatch {
                wizard_type: form.wizard_type.clone(),
                field: field.name.clone(),
            });
        }

        let mut wizard = Self {
            form,
            descriptor,
            persisted: true,
            dirty: false,
        };
        let index = wizard.form.index;
        if let Some(msg) = answer
            && let Some(field) = wizard.form.fields.get_mut(index)
            && field.was_requested
            && !field.is_filled()
            && field.field_type.is_auto()
        {
            field.field_type = detect_field_type(msg);
            tracing::debug!(
                field = %field.name,
                field_type = %field.field_type,
                "auto field type resolved"
            );
            wizard.dirty = true;
        }
        Ok(wizard)
    }

    /// Appends a field to be asked.
    pub fn add_empty_field(
        &mut self,
        name: &str,
        field_type: FieldType,
    ) -> Result<&mut Self, WizardError> {
        self.push_field(Field::empty(name, field_type))
    }

    /// Appends a field whose value is already known.
    pub fn add_prefilled_field(
        &mut self,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<&mut Self, WizardError> {
        self.push_field(Field::prefilled(name, value.into()))
    }

    /// Appends a field filled from `msg`, detecting its type.
    ///
    /// Fails with `WrongKind` when the message carries no extractable value.
    pub fn add_prefilled_auto_field(
        &mut self,
        name: &str,
        msg: &InboundMessage,
    ) -> Result<&mut Self, WizardError> {
        let (field_type, value) = extract::extract(FieldType::Auto, msg);
        let value = value.ok_or_else(|| WizardError::WrongKind(name.to_string()))?;
        self.push_field(Field {
            name: name.to_string(),
            value: Some(value),
            was_requested: false,
            field_type,
        })
    }

    /// Whether every field is filled or would be skipped, so completing the
    /// form needs no further input.
    pub fn all_required_fields_filled(&self) -> bool {
        self.form.fields.iter().all(|field| {
            field.is_filled()
                || self
                    .descriptor
                    .field(&field.name)
                    .is_some_and(|d| d.should_skip(&self.form))
        })
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn into_form(self) -> Form {
        self.form
    }

    pub fn descriptor(&self) -> &Arc<FormDescriptor> {
        &self.descriptor
    }

    pub fn wizard_type(&self) -> &str {
        &self.form.wizard_type
    }

    pub(crate) fn field_descriptor<'d>(
        descriptor: &'d FormDescriptor,
        form: &Form,
        name: &str,
    ) -> Result<&'d FieldDescriptor, WizardError> {
        descriptor
            .field(name)
            .ok_or_else(|| WizardError::DescriptorMismatch {
                wizard_type: form.wizard_type.clone(),
                field: name.to_string(),
            })
    }

    fn push_field(&mut self, field: Field) -> Result<&mut Self, WizardError> {
        if !self.descriptor.has_field(&field.name) {
            return Err(WizardError::UnknownField(field.name));
        }
        if self.form.fields.count_named(&field.name) > 0 {
            tracing::warn!(
                wizard_type = %self.form.wizard_type,
                field = %field.name,
                "duplicate field name, lookups will see the first one"
            );
        }
        self.form.fields.push(field);
        Ok(self)
    }
}
