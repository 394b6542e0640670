//! Download record CRUD, counters and title search.

use crate::error::DatabaseError;
use crate::terms::{TermSet, normalize_slug};
use crate::text::{fold_case, sanitize_text, strip_tags};
use crate::types::{
    DownloadId, DownloadInput, DownloadRecord, DownloadStatus, FileSource, TitleMatch,
};
use crate::{Error, Result};

use super::{DOWNLOAD_COLUMNS, Database, DownloadRow};

/// Maximum number of autocomplete matches
const MAX_TITLE_MATCHES: i64 = 50;

/// Write input after sanitization, ready to bind
struct SanitizedDownload {
    title: String,
    slug: String,
    description: String,
    excerpt: String,
    featured_image_id: i64,
    file_source: FileSource,
    file_id: i64,
    direct_url: String,
    categories: String,
    tags: String,
    status: DownloadStatus,
    search_title: String,
    search_body: String,
}

impl SanitizedDownload {
    fn from_input(input: &DownloadInput) -> Self {
        let title = sanitize_text(&input.title);
        let slug = input
            .slug
            .as_deref()
            .map(normalize_slug)
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| normalize_slug(&title));

        // Only the field matching the source is kept
        let (file_id, direct_url) = match input.file_source {
            FileSource::Media => (input.file_id.max(0), String::new()),
            FileSource::Direct => (0, input.direct_url.trim().to_string()),
        };

        let description = input.description.trim().to_string();
        let excerpt = strip_tags(&input.excerpt);
        // Description and excerpt stay separate lines; needles never contain '\n'
        let search_body = format!("{}\n{}", fold_case(&description), fold_case(&excerpt));

        Self {
            search_title: fold_case(&title),
            search_body,
            title,
            slug,
            description,
            excerpt,
            featured_image_id: input.featured_image_id.max(0),
            file_source: input.file_source,
            file_id,
            direct_url,
            categories: TermSet::parse(&input.categories).to_csv(),
            tags: TermSet::parse(&input.tags).to_csv(),
            status: input.status,
        }
    }
}

impl Database {
    /// Insert or update a download record
    ///
    /// Inserts when `input.id` is absent or 0, otherwise updates that record
    /// (download count and creation time are preserved). Input is sanitized,
    /// not validated: call [`DownloadInput::validate`] first.
    ///
    /// Updating an id that does not exist returns [`Error::NotFound`].
    pub async fn save_download(&self, input: &DownloadInput) -> Result<DownloadId> {
        let data = SanitizedDownload::from_input(input);
        let now = chrono::Utc::now().timestamp();

        match input.existing_id() {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO downloads (
                        title, slug, description, excerpt, featured_image_id,
                        file_source, file_id, direct_url, categories, tags,
                        download_count, status, created_at, updated_at,
                        search_title, search_body
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&data.title)
                .bind(&data.slug)
                .bind(&data.description)
                .bind(&data.excerpt)
                .bind(data.featured_image_id)
                .bind(data.file_source.as_str())
                .bind(data.file_id)
                .bind(&data.direct_url)
                .bind(&data.categories)
                .bind(&data.tags)
                .bind(data.status.as_str())
                .bind(now)
                .bind(now)
                .bind(&data.search_title)
                .bind(&data.search_body)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to insert download: {}",
                        e
                    )))
                })?;

                let id = DownloadId(result.last_insert_rowid());
                tracing::debug!(download_id = %id, "Inserted download");
                Ok(id)
            }
            Some(id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE downloads SET
                        title = ?, slug = ?, description = ?, excerpt = ?,
                        featured_image_id = ?, file_source = ?, file_id = ?,
                        direct_url = ?, categories = ?, tags = ?, status = ?,
                        updated_at = ?, search_title = ?, search_body = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&data.title)
                .bind(&data.slug)
                .bind(&data.description)
                .bind(&data.excerpt)
                .bind(data.featured_image_id)
                .bind(data.file_source.as_str())
                .bind(data.file_id)
                .bind(&data.direct_url)
                .bind(&data.categories)
                .bind(&data.tags)
                .bind(data.status.as_str())
                .bind(now)
                .bind(&data.search_title)
                .bind(&data.search_body)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to update download: {}",
                        e
                    )))
                })?;

                if result.rows_affected() == 0 {
                    return Err(Error::NotFound(format!("download {}", id)));
                }

                tracing::debug!(download_id = %id, "Updated download");
                Ok(id)
            }
        }
    }

    /// Get a download by ID, whatever its status
    pub async fn find_download(&self, id: DownloadId) -> Result<Option<DownloadRecord>> {
        let row = sqlx::query_as::<_, DownloadRow>(&format!(
            "SELECT {} FROM downloads WHERE id = ?",
            DOWNLOAD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get download: {}",
                e
            )))
        })?;

        Ok(row.map(DownloadRecord::from))
    }

    /// Delete a download, returning whether a row was removed
    pub async fn delete_download(&self, id: DownloadId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM downloads WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete download: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Atomically add one to the download counter
    ///
    /// Returns false when no record has this id.
    pub async fn increment_download_count(&self, id: DownloadId) -> Result<bool> {
        let result =
            sqlx::query("UPDATE downloads SET download_count = download_count + 1 WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to increment download count: {}",
                        e
                    )))
                })?;

        Ok(result.rows_affected() > 0)
    }

    /// Current download counter, 0 when the record is absent
    pub async fn get_download_count(&self, id: DownloadId) -> Result<u64> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT download_count FROM downloads WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to get download count: {}",
                        e
                    )))
                })?;

        Ok(count.unwrap_or(0).max(0) as u64)
    }

    /// Most recently created published record
    pub async fn latest_published(&self) -> Result<Option<DownloadRecord>> {
        let row = sqlx::query_as::<_, DownloadRow>(&format!(
            "SELECT {} FROM downloads WHERE status = ? ORDER BY created_at DESC, id DESC LIMIT 1",
            DOWNLOAD_COLUMNS
        ))
        .bind(DownloadStatus::Publish.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get latest download: {}",
                e
            )))
        })?;

        Ok(row.map(DownloadRecord::from))
    }

    /// Autocomplete over titles and slugs
    ///
    /// Case-insensitive substring match on title OR slug, newest first. `limit` is clamped to
    /// 1..=50; `status = None` matches any status.
    pub async fn search_by_title(
        &self,
        search: &str,
        limit: i64,
        status: Option<DownloadStatus>,
    ) -> Result<Vec<TitleMatch>> {
        let search = sanitize_text(search);
        let limit = limit.clamp(1, MAX_TITLE_MATCHES);

        let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            "SELECT id, title, slug, status FROM downloads WHERE 1 = 1",
        );

        if !search.is_empty() {
            let needle = fold_case(&search);
            builder
                .push(" AND (instr(search_title, ")
                .push_bind(needle.clone())
                .push(") > 0 OR instr(slug, ")
                .push_bind(needle)
                .push(") > 0)");
        }

        if let Some(status) = status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }

        builder
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit);

        let rows: Vec<(i64, String, String, String)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to search downloads by title: {}",
                    e
                )))
            })?;

        Ok(rows
            .into_iter()
            .map(|(id, title, slug, status)| TitleMatch {
                id: DownloadId(id),
                title,
                slug,
                status: DownloadStatus::from_str_lossy(&status),
            })
            .collect())
    }
}
