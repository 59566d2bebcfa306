use thiserror::Error;

/// Errors from repository operations (used by trait definitions in formbot-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}

/// Errors raised by a messaging transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport rejected the request: {0}")]
    Rejected(String),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the wizard engine.
///
/// `NoSuchWizard` is an expected outcome (the user has nothing in progress);
/// `DescriptorMismatch` means persisted state has drifted from the deployed
/// descriptors and is fatal to the current request.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("no registered wizard of type '{0}'")]
    NoSuchWizard(String),

    #[error("wizard '{wizard_type}' has no descriptor for field '{field}'")]
    DescriptorMismatch { wizard_type: String, field: String },

    #[error("field '{0}' is not declared by the wizard descriptor")]
    UnknownField(String),

    #[error("message does not contain a value for field '{0}'")]
    WrongKind(String),

    #[error("state storage error: {0}")]
    Storage(#[from] RepositoryError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("completion action failed: {0}")]
    Action(String),
}
