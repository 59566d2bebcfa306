//! In-memory wizard state storage.
//!
//! Process-local alternative to the SQLite store for development and for
//! deployments that can afford to lose in-progress forms on restart.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use formbot_core::wizard::StateStorage;
use formbot_types::error::RepositoryError;
use formbot_types::form::Form;

struct Entry {
    form: Form,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// `DashMap`-backed implementation of `StateStorage` with per-entry expiry.
pub struct InMemoryStateStorage {
    states: DashMap<i64, Entry>,
    ttl: Duration,
}

impl InMemoryStateStorage {
    pub fn new(ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
        }
    }

    /// Drops expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.states.len();
        self.states.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.states.len())
    }

    /// Number of entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl StateStorage for InMemoryStateStorage {
    async fn get_current_state(&self, user_id: i64) -> Result<Option<Form>, RepositoryError> {
        let now = Instant::now();
        match self.states.get(&user_id) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.form.clone())),
            Some(_) => {}
        }

        tracing::debug!(user_id, "wizard state expired");
        self.states.remove_if(&user_id, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn save_state(&self, user_id: i64, form: &Form) -> Result<(), RepositoryError> {
        let expires_at = Instant::now().checked_add(self.ttl);
        self.states.insert(
            user_id,
            Entry {
                form: form.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete_state(&self, user_id: i64) -> Result<(), RepositoryError> {
        match self.states.remove(&user_id) {
            Some((_, entry)) if !entry.is_expired(Instant::now()) => Ok(()),
            _ => Err(RepositoryError::NotFound),
        }
    }

    async fn close(&self) {
        self.states.clear();
    }
}
