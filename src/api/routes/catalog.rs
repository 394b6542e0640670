//! HTML catalog pages.

use super::parse_download_id;
use crate::Result;
use crate::api::AppState;
use axum::{
    extract::{OriginalUri, Path, RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

/// GET /catalog - Listing page with the filters form
///
/// Navigable parameters (search, category, tag, sort, page) come from the
/// URL; layout and page size come from the configuration.
#[utoipa::path(
    get,
    path = "/catalog",
    tag = "catalog",
    params(
        ("search" = Option<String>, Query, description = "Free-text search"),
        ("category" = Option<String>, Query, description = "Category slug"),
        ("tag" = Option<String>, Query, description = "Tag slug"),
        ("sort" = Option<String>, Query, description = "Sort key"),
        ("page" = Option<i64>, Query, description = "1-based page")
    ),
    responses(
        (status = 200, description = "HTML listing", body = String, content_type = "text/html"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn catalog_page(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Result<Html<String>> {
    let current_url = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let html = state
        .catalog
        .listing_page(query.as_deref().unwrap_or_default(), &current_url)
        .await?;
    Ok(Html(page("Downloads", &html)))
}

/// GET /catalog/:id - Card for a single published download
#[utoipa::path(
    get,
    path = "/catalog/{id}",
    tag = "catalog",
    params(
        ("id" = i64, Path, description = "Download ID")
    ),
    responses(
        (status = 200, description = "HTML card", body = String, content_type = "text/html"),
        (status = 404, description = "Download not found or not published")
    )
)]
pub async fn catalog_single(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let Ok(id) = parse_download_id(&id) else {
        return Ok(not_found());
    };
    let Some(record) = state.catalog.service.find_published(id).await? else {
        return Ok(not_found());
    };

    let card = state.catalog.renderer.render_single(&record).await?;
    Ok(Html(page(&crate::render::escape_html(&record.title), &card)).into_response())
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(page("Not found", "<p>Download not found.</p>")),
    )
        .into_response()
}
