//! Server-side throttle marks.
//!
//! A mark is an opaque key with an expiry in Unix milliseconds. An expired
//! mark can be claimed again as if it were absent, so purging is
//! housekeeping only.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::Database;

impl Database {
    /// Set the mark for `key` unless an unexpired one already exists
    ///
    /// Runs as a single upsert, so concurrent claims on the same key see
    /// exactly one winner. Returns true when this call set the mark, false
    /// when a live mark was already there (which is left untouched).
    pub async fn claim_throttle_mark(
        &self,
        key: &str,
        now_ms: i64,
        expires_at_ms: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO throttle_marks (key, expires_at)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET expires_at = excluded.expires_at
            WHERE throttle_marks.expires_at <= ?
            "#,
        )
        .bind(key)
        .bind(expires_at_ms)
        .bind(now_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to claim throttle mark: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete marks that expired at or before `now_ms`
    pub async fn purge_expired_throttle_marks(&self, now_ms: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM throttle_marks WHERE expires_at <= ?")
            .bind(now_ms)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to purge throttle marks: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }
}
