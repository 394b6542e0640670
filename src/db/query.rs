//! Filtered, sorted, paginated listing queries.
//!
//! Category and tag membership is tested against the comma-delimited column
//! wrapped in delimiters (`',' || categories || ','`), so a slug matches only
//! as a whole element wherever it sits in the list, and never as a substring
//! of a longer slug. Free-text search runs against the case-folded
//! `search_title`/`search_body` columns written on save.

use crate::error::DatabaseError;
use crate::query::{DownloadFilters, MAX_PER_PAGE, SortOrder};
use crate::terms::normalize_slug;
use crate::text::{fold_case, sanitize_text};
use crate::types::{DownloadRecord, QueryPage};
use crate::{Error, Result};
use sqlx::{QueryBuilder, Sqlite};

use super::{DOWNLOAD_COLUMNS, Database, DownloadRow};

/// ORDER BY clause for a sort order, with deterministic tie-breaks
fn order_by(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Newest => "created_at DESC, id DESC",
        SortOrder::Oldest => "created_at ASC, id ASC",
        SortOrder::Popular => "download_count DESC, created_at DESC, id DESC",
        SortOrder::TitleAsc => "title COLLATE NOCASE ASC, id ASC",
        SortOrder::TitleDesc => "title COLLATE NOCASE DESC, id ASC",
    }
}

/// Append the WHERE clause shared by the count and the page query
fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &DownloadFilters) {
    builder.push(" WHERE 1 = 1");

    if let Some(status) = filters.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }

    let search = sanitize_text(&filters.search);
    if !search.is_empty() {
        // Folded columns cover title, description and excerpt
        let needle = fold_case(&search);
        builder
            .push(" AND (instr(search_title, ")
            .push_bind(needle.clone())
            .push(") > 0 OR instr(search_body, ")
            .push_bind(needle)
            .push(") > 0)");
    }

    for (column, raw) in [("categories", &filters.category), ("tags", &filters.tag)] {
        let slug = normalize_slug(raw);
        if slug.is_empty() {
            continue;
        }
        builder
            .push(format!(" AND instr(',' || {} || ',', ", column))
            .push_bind(format!(",{},", slug))
            .push(") > 0");
    }
}

/// `ceil(total / per_page)`, 0 when nothing matched
pub(crate) fn total_pages(total: u64, per_page: u32) -> u32 {
    if total == 0 || per_page == 0 {
        return 0;
    }
    total.div_ceil(per_page as u64).min(u32::MAX as u64) as u32
}

impl Database {
    /// Run a listing query
    ///
    /// `per_page` is clamped to 1..=50 and `page` to at least 1. A page past
    /// the end yields no items but still reports the real total.
    pub async fn query_downloads(
        &self,
        filters: &DownloadFilters,
    ) -> Result<QueryPage<DownloadRecord>> {
        let per_page = filters.per_page.clamp(1, MAX_PER_PAGE as i64) as u32;
        let page = filters.page.clamp(1, u32::MAX as i64) as u32;
        let offset = (page as i64 - 1) * per_page as i64;

        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM downloads");
        push_filters(&mut count_query, filters);

        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count downloads: {}",
                    e
                )))
            })?;

        let mut page_query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM downloads", DOWNLOAD_COLUMNS));
        push_filters(&mut page_query, filters);
        page_query
            .push(" ORDER BY ")
            .push(order_by(filters.sort))
            .push(" LIMIT ")
            .push_bind(per_page as i64)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<DownloadRow> = page_query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to query downloads: {}",
                    e
                )))
            })?;

        let total = total.max(0) as u64;

        Ok(QueryPage {
            items: rows.into_iter().map(DownloadRecord::from).collect(),
            total,
            page,
            per_page,
            total_pages: total_pages(total, per_page),
        })
    }
}
