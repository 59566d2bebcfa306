//! Wizard state storage port.
//!
//! At most one form is active per user. Implementations live in
//! formbot-infra (SQLite and in-memory); both expire records that have not
//! been saved for longer than their configured lifetime.

use std::future::Future;
use std::pin::Pin;

use formbot_types::error::RepositoryError;
use formbot_types::form::Form;

/// Key prefix of persisted wizard states.
pub const COMMAND_STATE_PREFIX: &str = "command.state.user.";

/// Storage key for the state of `user_id`.
pub fn state_key(user_id: i64) -> String {
    format!("{COMMAND_STATE_PREFIX}{user_id}")
}

/// Persistence for in-progress forms, keyed by user id.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait StateStorage: Send + Sync {
    /// The live form of a user. Expired records read as `None`.
    fn get_current_state(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<Form>, RepositoryError>> + Send;

    /// Upsert the form of a user and restart its lifetime.
    fn save_state(
        &self,
        user_id: i64,
        form: &Form,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Remove the form of a user.
    ///
    /// Returns `RepositoryError::NotFound` when there was no live form.
    fn delete_state(&self, user_id: i64)
    -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Release underlying resources. Further calls may fail.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Object-safe version of [`StateStorage`] with boxed futures.
pub trait StateStorageDyn: Send + Sync {
    fn get_current_state_boxed(
        &self,
        user_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Form>, RepositoryError>> + Send + '_>>;

    fn save_state_boxed<'a>(
        &'a self,
        user_id: i64,
        form: &'a Form,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + 'a>>;

    fn delete_state_boxed(
        &self,
        user_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>>;

    fn close_boxed(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

impl<T: StateStorage> StateStorageDyn for T {
    fn get_current_state_boxed(
        &self,
        user_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Form>, RepositoryError>> + Send + '_>> {
        Box::pin(self.get_current_state(user_id))
    }

    fn save_state_boxed<'a>(
        &'a self,
        user_id: i64,
        form: &'a Form,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + 'a>> {
        Box::pin(self.save_state(user_id, form))
    }

    fn delete_state_boxed(
        &self,
        user_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>> {
        Box::pin(self.delete_state(user_id))
    }

    fn close_boxed(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(self.close())
    }
}

/// Shared handles delegate, so a backend can be boxed for the engine while
/// its owner keeps maintenance access.
impl<T: StateStorage> StateStorage for std::sync::Arc<T> {
    fn get_current_state(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<Form>, RepositoryError>> + Send {
        (**self).get_current_state(user_id)
    }

    fn save_state(
        &self,
        user_id: i64,
        form: &Form,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        (**self).save_state(user_id, form)
    }

    fn delete_state(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        (**self).delete_state(user_id)
    }

    fn close(&self) -> impl Future<Output = ()> + Send {
        (**self).close()
    }
}

/// Type-erased state storage, selected at runtime from configuration.
pub struct BoxStateStorage {
    inner: Box<dyn StateStorageDyn + Send + Sync>,
}

impl BoxStateStorage {
    pub fn new<T: StateStorage + 'static>(storage: T) -> Self {
        Self {
            inner: Box::new(storage),
        }
    }

    pub async fn get_current_state(&self, user_id: i64) -> Result<Option<Form>, RepositoryError> {
        self.inner.get_current_state_boxed(user_id).await
    }

    pub async fn save_state(&self, user_id: i64, form: &Form) -> Result<(), RepositoryError> {
        self.inner.save_state_boxed(user_id, form).await
    }

    pub async fn delete_state(&self, user_id: i64) -> Result<(), RepositoryError> {
        self.inner.delete_state_boxed(user_id).await
    }

    pub async fn close(&self) {
        self.inner.close_boxed().await
    }
}
