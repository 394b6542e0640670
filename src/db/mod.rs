//! Database layer for downloads-catalog
//!
//! Handles SQLite persistence for download records, the zero-count term
//! registries, throttle marks and the media library.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`downloads`] — Download record CRUD, counters, title search
//! - [`query`] — Filtered, sorted, paginated listing queries
//! - [`terms`] — Term aggregation, suggestions, register/rename/remove
//! - [`throttle`] — Server-side throttle marks
//! - [`media`] — Media library backing the built-in asset resolver

use crate::terms::TermSet;
use crate::types::{DownloadId, DownloadRecord, DownloadStatus, FileSource};
use sqlx::{FromRow, sqlite::SqlitePool};

mod downloads;
mod media;
mod migrations;
mod query;
mod terms;
mod throttle;

/// Download record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct DownloadRow {
    /// Unique database ID
    pub id: i64,
    /// Display title
    pub title: String,
    /// Normalized slug
    pub slug: String,
    /// Rich text description
    pub description: String,
    /// Explicit excerpt
    pub excerpt: String,
    /// Featured image asset (0 = none)
    pub featured_image_id: i64,
    /// "media" or "direct"
    pub file_source: String,
    /// Media attachment id
    pub file_id: i64,
    /// External URL
    pub direct_url: String,
    /// Comma-delimited category slugs
    pub categories: String,
    /// Comma-delimited tag slugs
    pub tags: String,
    /// Number of tracked downloads
    pub download_count: i64,
    /// "publish" or "draft"
    pub status: String,
    /// Unix timestamp when the record was created
    pub created_at: i64,
    /// Unix timestamp of the last update
    pub updated_at: i64,
}

impl From<DownloadRow> for DownloadRecord {
    fn from(row: DownloadRow) -> Self {
        use chrono::{TimeZone, Utc};

        DownloadRecord {
            id: DownloadId(row.id),
            title: row.title,
            slug: row.slug,
            description: row.description,
            excerpt: row.excerpt,
            featured_image_id: row.featured_image_id,
            file_source: FileSource::from_str_lossy(&row.file_source),
            file_id: row.file_id,
            direct_url: row.direct_url,
            categories: TermSet::parse(&row.categories),
            tags: TermSet::parse(&row.tags),
            download_count: row.download_count.max(0) as u64,
            status: DownloadStatus::from_str_lossy(&row.status),
            created_at: Utc
                .timestamp_opt(row.created_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
            updated_at: Utc
                .timestamp_opt(row.updated_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Media library entry
#[derive(Debug, Clone, FromRow)]
pub struct MediaRow {
    /// Unique database ID (the `file_id` / `featured_image_id` records point at)
    pub id: i64,
    /// Public URL of the attachment
    pub url: String,
    /// Display rendition for images, if different from `url`
    pub image_url: Option<String>,
    /// Unix timestamp when the entry was created
    pub created_at: i64,
}

/// Columns selected for every [`DownloadRow`] query
pub(crate) const DOWNLOAD_COLUMNS: &str = "id, title, slug, description, excerpt, \
     featured_image_id, file_source, file_id, direct_url, categories, tags, \
     download_count, status, created_at, updated_at";

/// Database handle for downloads-catalog
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
