//! Multi-step form collection ("wizards").
//!
//! A wizard asks a user for a series of fields, one message at a time, and
//! runs a completion action once all of them are known. Progress survives
//! restarts through [`StateStorage`]; behaviour (extraction, validation,
//! keyboards, the action) is re-attached from the [`WizardRegistry`] on
//! every message.

pub mod callback;
pub mod descriptor;
pub mod engine;
pub mod extract;
pub mod form;
pub mod registry;
pub mod skip;
pub mod storage;
pub mod validate;

pub use callback::{CALLBACK_DATA_FIELD_PREFIX, CallbackOutcome};
pub use descriptor::{
    ActionContext, FieldDescriptor, FormAction, FormDescriptor, Keyboard, OptionSource,
};
pub use engine::{FormEngine, Rejection, ResumeOutcome, Transition};
pub use form::Wizard;
pub use registry::{WizardHandler, WizardRegistry};
pub use skip::{SkipCondition, SkipIfFieldFilled, SkipOnFieldValue};
pub use storage::{BoxStateStorage, StateStorage};
pub use validate::ValidationError;
