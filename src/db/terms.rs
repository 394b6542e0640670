//! Term aggregation and the zero-count term registries.
//!
//! Terms are not rows: they are derived from the comma-delimited membership
//! columns. A registry per column (a JSON slug array in `runtime_state`)
//! keeps terms alive while no download uses them. Rename and remove patch
//! every affected record; both run inside one transaction together with the
//! registry update. Every registry read-modify-write holds the write lock
//! from the start, so concurrent updates serialize instead of losing slugs.

use crate::error::DatabaseError;
use crate::terms::{Term, TermColumn, TermSet, facet_counts, normalize_slug};
use crate::types::DownloadStatus;
use crate::{Error, Result};
use sqlx::SqliteConnection;

use super::Database;

/// Largest number of suggestions returned
const MAX_SUGGESTIONS: usize = 50;

impl Database {
    /// Facet list for a column: every slug in use plus every registered slug
    ///
    /// Counts only records matching `status` (`None` = any status). Registered
    /// slugs with no members appear with `count = 0`. Sorted by slug.
    pub async fn aggregate_terms(
        &self,
        column: TermColumn,
        status: Option<DownloadStatus>,
    ) -> Result<Vec<Term>> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to acquire connection: {}",
                e
            )))
        })?;

        let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(format!(
            "SELECT {col} FROM downloads WHERE {col} <> ''",
            col = column.column()
        ));
        if let Some(status) = status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }

        let memberships: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to aggregate {}: {}",
                    column, e
                )))
            })?;

        let mut counts = facet_counts(memberships.iter().map(String::as_str));
        for slug in Self::load_registry(&mut *conn, column).await? {
            counts.entry(slug).or_insert(0);
        }

        Ok(counts
            .into_iter()
            .map(|(slug, count)| Term::new(slug, count))
            .collect())
    }

    /// Autocomplete over [`aggregate_terms`](Self::aggregate_terms) (any status)
    ///
    /// Keeps terms whose slug, or normalized display name, contains the
    /// normalized search. An empty search keeps everything. `limit` is
    /// clamped to 1..=50.
    pub async fn suggest_terms(
        &self,
        column: TermColumn,
        search: &str,
        limit: usize,
    ) -> Result<Vec<Term>> {
        let needle = normalize_slug(search);
        let limit = limit.clamp(1, MAX_SUGGESTIONS);

        Ok(self
            .aggregate_terms(column, None)
            .await?
            .into_iter()
            .filter(|term| {
                needle.is_empty()
                    || term.slug.contains(&needle)
                    || normalize_slug(&term.name).contains(&needle)
            })
            .take(limit)
            .collect())
    }

    /// Add a slug to the zero-count registry
    ///
    /// Returns false when the term normalizes to nothing. Registering an
    /// already registered slug is a successful no-op.
    pub async fn register_term(&self, column: TermColumn, term: &str) -> Result<bool> {
        let slug = normalize_slug(term);
        if slug.is_empty() {
            return Ok(false);
        }

        let mut tx = self.begin_write().await?;

        let mut registry = Self::load_registry(&mut *tx, column).await?;
        if !registry.contains(&slug) {
            registry.push(slug);
            Self::store_registry(&mut *tx, column, registry).await?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit term registration: {}",
                e
            )))
        })?;

        Ok(true)
    }

    /// Rename a term in the registry and in every record that carries it
    ///
    /// Records already containing `new` end up with a single `new` entry.
    /// Returns false when either slug normalizes to nothing; renaming a slug
    /// to itself is a successful no-op.
    pub async fn rename_term(&self, column: TermColumn, old: &str, new: &str) -> Result<bool> {
        let old = normalize_slug(old);
        let new = normalize_slug(new);

        if old.is_empty() || new.is_empty() {
            return Ok(false);
        }
        if old == new {
            return Ok(true);
        }

        let mut tx = self.begin_write().await?;

        let mut registry = Self::load_registry(&mut *tx, column).await?;
        registry.retain(|slug| slug != &old);
        if !registry.contains(&new) {
            registry.push(new.clone());
        }
        Self::store_registry(&mut *tx, column, registry).await?;

        let rewritten =
            Self::rewrite_memberships(&mut *tx, column, &old, |set| set.replace(&old, &new))
                .await?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit term rename: {}",
                e
            )))
        })?;

        tracing::info!(%column, %old, %new, rewritten, "Renamed term");
        Ok(true)
    }

    /// Remove a term from the registry and from every record that carries it
    ///
    /// Returns false when the slug normalizes to nothing.
    pub async fn remove_term(&self, column: TermColumn, term: &str) -> Result<bool> {
        let slug = normalize_slug(term);
        if slug.is_empty() {
            return Ok(false);
        }

        let mut tx = self.begin_write().await?;

        let mut registry = Self::load_registry(&mut *tx, column).await?;
        let before = registry.len();
        registry.retain(|s| s != &slug);
        if registry.len() != before {
            Self::store_registry(&mut *tx, column, registry).await?;
        }

        let rewritten =
            Self::rewrite_memberships(&mut *tx, column, &slug, |set| set.remove(&slug)).await?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit term removal: {}",
                e
            )))
        })?;

        tracing::info!(%column, %slug, rewritten, "Removed term");
        Ok(true)
    }

    /// Transaction holding the write lock from its first statement
    ///
    /// Registry updates read before they write. Taking the lock up front
    /// makes concurrent writers wait on the busy timeout instead of
    /// overwriting each other or failing on lock upgrade.
    async fn begin_write(&self) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>> {
        self.pool.begin_with("BEGIN IMMEDIATE").await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })
    }

    /// Registered slugs for a column, normalized, deduplicated and sorted
    async fn load_registry(conn: &mut SqliteConnection, column: TermColumn) -> Result<Vec<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM runtime_state WHERE key = ?")
                .bind(column.registry_key())
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to load {} registry: {}",
                        column, e
                    )))
                })?;

        let Some(value) = value else {
            return Ok(Vec::new());
        };

        let raw: Vec<String> = match serde_json::from_str(&value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(%column, error = %e, "Ignoring malformed term registry");
                Vec::new()
            }
        };

        let mut slugs: Vec<String> = raw
            .iter()
            .map(|s| normalize_slug(s))
            .filter(|s| !s.is_empty())
            .collect();
        slugs.sort();
        slugs.dedup();
        Ok(slugs)
    }

    async fn store_registry(
        conn: &mut SqliteConnection,
        column: TermColumn,
        mut slugs: Vec<String>,
    ) -> Result<()> {
        slugs.sort();
        slugs.dedup();
        let value = serde_json::to_string(&slugs)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO runtime_state (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(column.registry_key())
        .bind(&value)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to store {} registry: {}",
                column, e
            )))
        })?;

        Ok(())
    }

    /// Apply `patch` to every record whose column contains `slug`
    ///
    /// Returns the number of records written.
    async fn rewrite_memberships<F>(
        conn: &mut SqliteConnection,
        column: TermColumn,
        slug: &str,
        mut patch: F,
    ) -> Result<u64>
    where
        F: FnMut(&mut TermSet) -> bool,
    {
        let rows: Vec<(i64, String)> = sqlx::query_as(&format!(
            "SELECT id, {col} FROM downloads WHERE instr(',' || {col} || ',', ?) > 0",
            col = column.column()
        ))
        .bind(format!(",{},", slug))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to scan {} memberships: {}",
                column, e
            )))
        })?;

        let now = chrono::Utc::now().timestamp();
        let update = format!(
            "UPDATE downloads SET {} = ?, updated_at = ? WHERE id = ?",
            column.column()
        );
        let mut rewritten = 0;

        for (id, csv) in rows {
            let mut set = TermSet::parse(&csv);
            if !patch(&mut set) {
                continue;
            }

            sqlx::query(&update)
                .bind(set.to_csv())
                .bind(now)
                .bind(id)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to rewrite {} of download {}: {}",
                        column, id, e
                    )))
                })?;
            rewritten += 1;
        }

        Ok(rewritten)
    }
}
