//! Write API for downloads and terms.
//!
//! Gated by the API key middleware when a key is configured.

use super::{AdminListQuery, RegisterTermRequest, RenameTermRequest, parse_download_id, parse_number};
use crate::api::AppState;
use crate::error::ValidationError;
use crate::query::{BuiltQuery, QueryInput, QueryState};
use crate::terms::{Term, TermColumn};
use crate::types::{DownloadInput, DownloadRecord, DownloadStatus, QueryPage};
use crate::{Error, Result};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;

/// One page of records over any status
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DownloadRecordPage {
    /// Records on this page
    pub items: Vec<DownloadRecord>,
    /// Number of matching records
    pub total: u64,
    /// Current page
    pub page: u32,
    /// Page size
    pub per_page: u32,
    /// Number of pages
    pub total_pages: u32,
}

impl From<QueryPage<DownloadRecord>> for DownloadRecordPage {
    fn from(page: QueryPage<DownloadRecord>) -> Self {
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages: page.total_pages,
        }
    }
}

/// GET /admin/downloads - Listing including drafts
#[utoipa::path(
    get,
    path = "/api/v1/admin/downloads",
    tag = "admin",
    params(
        ("status" = Option<String>, Query, description = "publish or draft; empty means any status"),
        ("search" = Option<String>, Query, description = "Free-text search"),
        ("category" = Option<String>, Query, description = "Category slug"),
        ("tag" = Option<String>, Query, description = "Tag slug"),
        ("sort" = Option<String>, Query, description = "Sort key"),
        ("page" = Option<i64>, Query, description = "1-based page"),
        ("per_page" = Option<i64>, Query, description = "Page size, 1..=50")
    ),
    responses(
        (status = 200, description = "Page of stored records", body = DownloadRecordPage),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    ),
    security(("api_key" = []))
)]
pub async fn admin_list_downloads(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<DownloadRecordPage>> {
    let input = QueryInput {
        search: query.search,
        category: query.category,
        tag: query.tag,
        sort: query.sort,
        page: parse_number(query.page.as_deref()),
        per_page: parse_number(query.per_page.as_deref()).or(Some(state.config.listing.per_page)),
        ..Default::default()
    };
    let BuiltQuery { mut filters, .. } = QueryState::build(&input, None);
    filters.status = DownloadStatus::filter_from_str(query.status.as_deref().unwrap_or_default());

    let page = state.catalog.db.query_downloads(&filters).await?;
    Ok(Json(page.into()))
}

/// POST /admin/downloads - Create a download
#[utoipa::path(
    post,
    path = "/api/v1/admin/downloads",
    tag = "admin",
    request_body = DownloadInput,
    responses(
        (status = 201, description = "Download created", body = DownloadRecord),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 422, description = "Validation failed", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    ),
    security(("api_key" = []))
)]
pub async fn create_download(
    State(state): State<AppState>,
    Json(mut input): Json<DownloadInput>,
) -> Result<(StatusCode, Json<DownloadRecord>)> {
    input.id = None;
    let record = save_and_reload(&state, &input).await?;
    tracing::info!(download_id = %record.id, title = %record.title, "Download created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /admin/downloads/:id - Replace a download's fields
#[utoipa::path(
    put,
    path = "/api/v1/admin/downloads/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Download ID")
    ),
    request_body = DownloadInput,
    responses(
        (status = 200, description = "Download updated", body = DownloadRecord),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 404, description = "Download not found", body = crate::error::ApiError),
        (status = 422, description = "Validation failed", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    ),
    security(("api_key" = []))
)]
pub async fn update_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut input): Json<DownloadInput>,
) -> Result<Json<DownloadRecord>> {
    input.id = Some(parse_download_id(&id)?);
    let record = save_and_reload(&state, &input).await?;
    tracing::info!(download_id = %record.id, "Download updated");
    Ok(Json(record))
}

/// DELETE /admin/downloads/:id - Delete a download
#[utoipa::path(
    delete,
    path = "/api/v1/admin/downloads/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Download ID")
    ),
    responses(
        (status = 204, description = "Download deleted"),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 404, description = "Download not found", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    ),
    security(("api_key" = []))
)]
pub async fn delete_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_download_id(&id)?;
    if state.catalog.db.delete_download(id).await? {
        tracing::info!(download_id = %id, "Download deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound(format!("download {}", id)))
    }
}

/// GET /admin/terms/:column - Facet counts over every status
#[utoipa::path(
    get,
    path = "/api/v1/admin/terms/{column}",
    tag = "admin",
    params(
        ("column" = String, Path, description = "categories or tags")
    ),
    responses(
        (status = 200, description = "Every term in use or registered, sorted by slug", body = Vec<Term>),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 404, description = "Unknown term column", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    ),
    security(("api_key" = []))
)]
pub async fn admin_list_terms(
    State(state): State<AppState>,
    Path(column): Path<String>,
) -> Result<Json<Vec<Term>>> {
    let column: TermColumn = column.parse()?;
    Ok(Json(state.catalog.db.aggregate_terms(column, None).await?))
}

/// POST /admin/terms/:column - Register a term so it is listed before it has members
#[utoipa::path(
    post,
    path = "/api/v1/admin/terms/{column}",
    tag = "admin",
    params(
        ("column" = String, Path, description = "categories or tags")
    ),
    request_body = RegisterTermRequest,
    responses(
        (status = 204, description = "Term registered (or already registered)"),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 404, description = "Unknown term column", body = crate::error::ApiError),
        (status = 422, description = "Slug is empty after normalization", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    ),
    security(("api_key" = []))
)]
pub async fn register_term(
    State(state): State<AppState>,
    Path(column): Path<String>,
    Json(request): Json<RegisterTermRequest>,
) -> Result<StatusCode> {
    let column: TermColumn = column.parse()?;
    term_outcome(state.catalog.db.register_term(column, &request.slug).await?)
}

/// PUT /admin/terms/:column/:slug - Rename a term on every download and in the registry
#[utoipa::path(
    put,
    path = "/api/v1/admin/terms/{column}/{slug}",
    tag = "admin",
    params(
        ("column" = String, Path, description = "categories or tags"),
        ("slug" = String, Path, description = "Term to rename")
    ),
    request_body = RenameTermRequest,
    responses(
        (status = 204, description = "Term renamed"),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 404, description = "Unknown term column", body = crate::error::ApiError),
        (status = 422, description = "A slug is empty after normalization", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    ),
    security(("api_key" = []))
)]
pub async fn rename_term(
    State(state): State<AppState>,
    Path((column, slug)): Path<(String, String)>,
    Json(request): Json<RenameTermRequest>,
) -> Result<StatusCode> {
    let column: TermColumn = column.parse()?;
    let renamed = state
        .catalog
        .db
        .rename_term(column, &slug, &request.new_slug)
        .await?;
    if renamed {
        tracing::info!(%column, from = %slug, to = %request.new_slug, "Term renamed");
    }
    term_outcome(renamed)
}

/// DELETE /admin/terms/:column/:slug - Remove a term from every download and the registry
#[utoipa::path(
    delete,
    path = "/api/v1/admin/terms/{column}/{slug}",
    tag = "admin",
    params(
        ("column" = String, Path, description = "categories or tags"),
        ("slug" = String, Path, description = "Term to remove")
    ),
    responses(
        (status = 204, description = "Term removed"),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 404, description = "Unknown term column", body = crate::error::ApiError),
        (status = 422, description = "Slug is empty after normalization", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    ),
    security(("api_key" = []))
)]
pub async fn remove_term(
    State(state): State<AppState>,
    Path((column, slug)): Path<(String, String)>,
) -> Result<StatusCode> {
    let column: TermColumn = column.parse()?;
    term_outcome(state.catalog.db.remove_term(column, &slug).await?)
}

async fn save_and_reload(state: &AppState, input: &DownloadInput) -> Result<DownloadRecord> {
    input.validate()?;
    let id = state.catalog.db.save_download(input).await?;
    state
        .catalog
        .db
        .find_download(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("download {}", id)))
}

/// Term operations signal an unusable slug with `false`
fn term_outcome(applied: bool) -> Result<StatusCode> {
    if applied {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::Validation(ValidationError::EmptySlug))
    }
}
