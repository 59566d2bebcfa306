//! SQLite wizard state storage.
//!
//! Implements `StateStorage` from `formbot-core`. One row per user, keyed by
//! `command.state.user.<id>`, holding the form as JSON. Every save pushes
//! `expires_at` forward by the configured lifetime; expired rows read as
//! absent and are removed lazily or by [`SqliteStateStorage::purge_expired`].

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use sqlx::Row;

use formbot_core::wizard::StateStorage;
use formbot_core::wizard::storage::state_key;
use formbot_types::error::RepositoryError;
use formbot_types::form::Form;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `StateStorage`.
pub struct SqliteStateStorage {
    pool: DatabasePool,
    ttl: TimeDelta,
}

impl SqliteStateStorage {
    pub fn new(pool: DatabasePool, ttl: Duration) -> Self {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        Self { pool, ttl }
    }

    /// Deletes every expired row, returning how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM wizard_states WHERE expires_at <= ?")
            .bind(format_datetime(&Utc::now()))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let purged = result.rows_affected();
        if purged > 0 {
            tracing::debug!(purged, "purged expired wizard states");
        }
        Ok(purged)
    }

    /// Number of live states.
    pub async fn count(&self) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM wizard_states WHERE expires_at > ?")
            .bind(format_datetime(&Utc::now()))
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(n.max(0) as u64)
    }

    fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let latest = latest_expiry();
        now.checked_add_signed(self.ttl)
            .filter(|at| *at <= latest)
            .unwrap_or(latest)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

// Fixed-width UTC timestamps compare correctly as text.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// 9999-12-31T23:59:59Z, the last instant with a four-digit year. Later
/// timestamps would break the text ordering of `expires_at`.
const LATEST_EXPIRY_SECS: i64 = 253_402_300_799;

fn latest_expiry() -> DateTime<Utc> {
    DateTime::from_timestamp(LATEST_EXPIRY_SECS, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

// ---------------------------------------------------------------------------
// StateStorage implementation
// ---------------------------------------------------------------------------

impl StateStorage for SqliteStateStorage {
    async fn get_current_state(&self, user_id: i64) -> Result<Option<Form>, RepositoryError> {
        let key = state_key(user_id);
        let row = sqlx::query("SELECT form, expires_at FROM wizard_states WHERE state_key = ?")
            .bind(&key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: String = row
            .try_get("expires_at")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        if parse_datetime(&expires_at)? <= Utc::now() {
            tracing::debug!(user_id, "wizard state expired");
            sqlx::query("DELETE FROM wizard_states WHERE state_key = ? AND expires_at = ?")
                .bind(&key)
                .bind(&expires_at)
                .execute(&self.pool.writer)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            return Ok(None);
        }

        let form_json: String = row
            .try_get("form")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let form = serde_json::from_str(&form_json)
            .map_err(|e| RepositoryError::Query(format!("invalid form JSON: {e}")))?;
        Ok(Some(form))
    }

    async fn save_state(&self, user_id: i64, form: &Form) -> Result<(), RepositoryError> {
        let now = Utc::now();
        let form_json = serde_json::to_string(form)
            .map_err(|e| RepositoryError::Query(format!("failed to serialize form: {e}")))?;

        sqlx::query(
            "INSERT INTO wizard_states (state_key, user_id, form, expires_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(state_key) DO UPDATE SET \
             form = excluded.form, expires_at = excluded.expires_at, \
             updated_at = excluded.updated_at",
        )
        .bind(state_key(user_id))
        .bind(user_id)
        .bind(&form_json)
        .bind(format_datetime(&self.expires_at(now)))
        .bind(format_datetime(&now))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn delete_state(&self, user_id: i64) -> Result<(), RepositoryError> {
        let key = state_key(user_id);
        let now = format_datetime(&Utc::now());

        let live = sqlx::query("DELETE FROM wizard_states WHERE state_key = ? AND expires_at > ?")
            .bind(&key)
            .bind(&now)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if live.rows_affected() == 0 {
            // An expired row counts as absent; drop it anyway.
            sqlx::query("DELETE FROM wizard_states WHERE state_key = ?")
                .bind(&key)
                .execute(&self.pool.writer)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
