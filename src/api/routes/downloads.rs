//! Public read API and tracking.

use super::{ListDownloadsQuery, SuggestQuery, client_context, marker_cookies, parse_download_id, parse_number};
use crate::api::AppState;
use crate::catalog::DownloadListing;
use crate::query::QueryInput;
use crate::types::{DownloadPayload, DownloadStatus, TitleMatch, TrackResponse};
use crate::{Error, Result};
use axum::{
    Json,
    extract::{ConnectInfo, Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use std::net::SocketAddr;

/// Title autocomplete size when the caller gives none
const DEFAULT_SEARCH_RESULTS: i64 = 12;

/// Fallback base for pagination links when no context URL is given
const LISTING_PAGE: &str = "/catalog";

/// GET /downloads - Filtered, sorted, paginated listing
///
/// Built from the query parameters alone, with the filters form hidden.
#[utoipa::path(
    get,
    path = "/api/v1/downloads",
    tag = "downloads",
    params(
        ("search" = Option<String>, Query, description = "Free-text search"),
        ("category" = Option<String>, Query, description = "Category slug"),
        ("tag" = Option<String>, Query, description = "Tag slug"),
        ("sort" = Option<String>, Query, description = "newest, oldest, popular, title_asc or title_desc"),
        ("page" = Option<i64>, Query, description = "1-based page (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Page size, 1..=50"),
        ("layout" = Option<String>, Query, description = "grid or table"),
        ("context_url" = Option<String>, Query, description = "Base URL for pagination links")
    ),
    responses(
        (status = 200, description = "Listing page", body = DownloadListing),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_downloads(
    State(state): State<AppState>,
    Query(query): Query<ListDownloadsQuery>,
) -> Result<Json<DownloadListing>> {
    let input = query.to_input(QueryInput::from_listing(&state.config.listing));
    let context_url = query
        .context_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty());

    let listing = state
        .catalog
        .listing(&input, context_url, LISTING_PAGE)
        .await?;
    Ok(Json(listing))
}

/// GET /downloads/search - Title autocomplete over published downloads
#[utoipa::path(
    get,
    path = "/api/v1/downloads/search",
    tag = "downloads",
    params(
        ("search" = Option<String>, Query, description = "Substring of the title or slug"),
        ("per_page" = Option<i64>, Query, description = "Maximum results, 1..=50 (default: 12)")
    ),
    responses(
        (status = 200, description = "Matching downloads, newest first", body = Vec<TitleMatch>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn search_downloads(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<Vec<TitleMatch>>> {
    let limit = parse_number(query.per_page.as_deref()).unwrap_or(DEFAULT_SEARCH_RESULTS);
    let matches = state
        .catalog
        .db
        .search_by_title(
            query.search.as_deref().unwrap_or_default(),
            limit,
            Some(DownloadStatus::Publish),
        )
        .await?;
    Ok(Json(matches))
}

/// GET /downloads/:id - Single download payload
#[utoipa::path(
    get,
    path = "/api/v1/downloads/{id}",
    tag = "downloads",
    params(
        ("id" = i64, Path, description = "Download ID")
    ),
    responses(
        (status = 200, description = "Download payload", body = DownloadPayload),
        (status = 404, description = "Download not found or not published", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DownloadPayload>> {
    let id = parse_download_id(&id)?;
    let record = state
        .catalog
        .service
        .find_published(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("download {}", id)))?;

    Ok(Json(state.catalog.service.payload(&record).await?))
}

/// POST /downloads/:id/track - Record a download
///
/// A throttled call is a normal outcome: `tracked = false, throttled = true`.
#[utoipa::path(
    post,
    path = "/api/v1/downloads/{id}/track",
    tag = "downloads",
    params(
        ("id" = i64, Path, description = "Download ID")
    ),
    responses(
        (status = 200, description = "Tracking outcome; marker cookies are set for the throttle window", body = TrackResponse),
        (status = 404, description = "Download not found or not published", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn track_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let id = parse_download_id(&id)?;
    let service = &state.catalog.service;
    if service.find_published(id).await?.is_none() {
        return Err(Error::NotFound(format!("download {}", id)));
    }

    let mut client = client_context(&state, &headers, connect_info.map(|c| c.0), &jar);
    let tracked = service.track_download(id, &mut client).await?;
    let download_count = state.catalog.db.get_download_count(id).await?;

    let response = TrackResponse {
        tracked,
        throttled: !tracked,
        download_count,
    };
    Ok((marker_cookies(&state, &client), Json(response)))
}
