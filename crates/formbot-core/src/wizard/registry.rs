//! Process-wide wizard descriptor registry.
//!
//! Descriptors are collected once at startup from every handler that can
//! start a wizard, keyed by the wizard type name stored in each [`Form`].
//!
//! [`Form`]: formbot_types::form::Form

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use formbot_types::error::WizardError;

use crate::dispatch::MessageHandler;

use super::descriptor::FormDescriptor;
use super::form::Wizard;

/// A handler that drives a wizard.
pub trait WizardHandler: Send + Sync {
    /// Stable identifier, conventionally the handler type name
    /// (e.g. `"ProfileHandler"`).
    fn wizard_id(&self) -> &str;

    /// Builds the descriptor of this wizard. Called once at registration.
    fn wizard_descriptor(&self) -> FormDescriptor;

    /// Type name under which forms of this wizard are stored.
    fn wizard_type(&self) -> String {
        wizard_type_name(self.wizard_id())
    }
}

/// Derives a wizard type name from a handler id: a trailing `Handler` is
/// replaced by `Wizard`, otherwise `Wizard` is appended.
pub fn wizard_type_name(id: &str) -> String {
    let base = id.strip_suffix("Handler").unwrap_or(id);
    format!("{base}Wizard")
}

/// Descriptors by wizard type name; populated at most once.
#[derive(Default)]
pub struct WizardRegistry {
    entries: OnceLock<Entries>,
}

struct Entries {
    descriptors: HashMap<String, Arc<FormDescriptor>>,
    /// Handler id to wizard type name, derived once at registration.
    type_names: HashMap<String, String>,
}

impl WizardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the descriptor of every wizard handler in `handlers`.
    ///
    /// Returns `false` without changes if the registry was already populated.
    pub fn populate(&self, handlers: &[Arc<dyn MessageHandler>]) -> bool {
        self.populate_wizards(handlers.iter().filter_map(|h| h.as_wizard()))
    }

    /// Registers the given wizards. Same contract as [`populate`](Self::populate).
    pub fn populate_wizards<'a>(
        &self,
        wizards: impl IntoIterator<Item = &'a dyn WizardHandler>,
    ) -> bool {
        if self.entries.get().is_some() {
            tracing::debug!("wizard registry already populated");
            return false;
        }

        let mut descriptors = HashMap::new();
        let mut type_names = HashMap::new();
        for wizard in wizards {
            let name = wizard.wizard_type();
            if descriptors.contains_key(&name) {
                tracing::warn!(wizard_type = %name, "duplicate wizard type, keeping the last one");
            }
            descriptors.insert(name.clone(), Arc::new(wizard.wizard_descriptor()));
            type_names.insert(wizard.wizard_id().to_string(), name);
        }
        let count = descriptors.len();

        let entries = Entries {
            descriptors,
            type_names,
        };
        if self.entries.set(entries).is_err() {
            tracing::debug!("wizard registry populated concurrently");
            return false;
        }
        tracing::info!(count, "wizard descriptors registered");
        true
    }

    /// Starts an empty wizard of `handler`'s type.
    pub fn new_wizard(&self, handler: &dyn WizardHandler) -> Result<Wizard, WizardError> {
        Wizard::new(self, handler)
    }

    pub fn get(&self, wizard_type: &str) -> Option<Arc<FormDescriptor>> {
        self.entries.get()?.descriptors.get(wizard_type).cloned()
    }

    /// Wizard type name registered for the handler with `wizard_id`.
    pub fn type_name(&self, wizard_id: &str) -> Option<&str> {
        self.entries
            .get()?
            .type_names
            .get(wizard_id)
            .map(String::as_str)
    }

    pub fn is_populated(&self) -> bool {
        self.entries.get().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.get().map_or(0, |e| e.descriptors.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
