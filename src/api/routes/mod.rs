//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`] — Public read API and tracking
//! - [`terms`] — Category/tag suggestions
//! - [`delivery`] — Tracked redirect to the file
//! - [`catalog`] — HTML listing pages
//! - [`admin`] — Write API for downloads and terms
//! - [`system`] — Health, OpenAPI

use crate::api::AppState;
use crate::query::QueryInput;
use crate::service::ClientContext;
use crate::types::DownloadId;
use crate::{Error, Result};
use axum::http::{HeaderMap, HeaderValue, header::SET_COOKIE};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

mod admin;
mod catalog;
mod delivery;
mod downloads;
mod system;
mod terms;

// Re-export all handlers so `routes::function_name` works from the router
pub use admin::*;
pub use catalog::*;
pub use delivery::*;
pub use downloads::*;
pub use system::*;
pub use terms::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /downloads
///
/// Everything is taken as text; values that don't parse fall back to the
/// listing defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ListDownloadsQuery {
    /// Free-text search over title, description and excerpt
    pub search: Option<String>,
    /// Category slug
    pub category: Option<String>,
    /// Tag slug
    pub tag: Option<String>,
    /// newest, oldest, popular, title_asc or title_desc (default: newest)
    pub sort: Option<String>,
    /// 1-based page (default: 1)
    pub page: Option<String>,
    /// Page size, 1..=50 (default: configured listing size)
    pub per_page: Option<String>,
    /// grid or table (default: configured layout)
    pub layout: Option<String>,
    /// Base URL for pagination links in the rendered fragment
    pub context_url: Option<String>,
}

impl ListDownloadsQuery {
    /// Merge onto `baseline`; only parameters present in the request override it
    pub fn to_input(&self, baseline: QueryInput) -> QueryInput {
        QueryInput {
            search: self.search.clone().or(baseline.search),
            category: self.category.clone().or(baseline.category),
            tag: self.tag.clone().or(baseline.tag),
            sort: self.sort.clone().or(baseline.sort),
            page: parse_number(self.page.as_deref()).or(baseline.page),
            per_page: parse_number(self.per_page.as_deref()).or(baseline.per_page),
            layout: self.layout.clone().or(baseline.layout),
            ..baseline
        }
    }
}

/// Query parameters for GET /admin/downloads
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AdminListQuery {
    /// publish or draft; empty or absent means any status
    pub status: Option<String>,
    /// Free-text search
    pub search: Option<String>,
    /// Category slug
    pub category: Option<String>,
    /// Tag slug
    pub tag: Option<String>,
    /// Sort key (default: newest)
    pub sort: Option<String>,
    /// 1-based page (default: 1)
    pub page: Option<String>,
    /// Page size, 1..=50 (default: configured listing size)
    pub per_page: Option<String>,
}

/// Query parameters for autocomplete endpoints
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SuggestQuery {
    /// Text to match
    pub search: Option<String>,
    /// Maximum number of results
    pub per_page: Option<String>,
}

/// Request body for POST /admin/terms/:column
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RegisterTermRequest {
    /// Term to register; normalized to a slug
    pub slug: String,
}

/// Request body for PUT /admin/terms/:column/:slug
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RenameTermRequest {
    /// Replacement term; normalized to a slug
    pub new_slug: String,
}

// ============================================================================
// Helpers
// ============================================================================

/// Lenient integer parse for query parameters
pub(crate) fn parse_number(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
}

/// Download id from a path segment; anything but a positive integer is not found
pub(crate) fn parse_download_id(raw: &str) -> Result<DownloadId> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .map(DownloadId)
        .ok_or_else(|| Error::NotFound(format!("download '{}'", raw)))
}

/// Client identity for throttling, taken from the request
pub(crate) fn client_context(
    state: &AppState,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    jar: &CookieJar,
) -> ClientContext {
    ClientContext::from_request(
        headers,
        peer.map(|addr| addr.ip()),
        jar.iter().map(|cookie| (cookie.name(), cookie.value())),
        &state.config.tracking,
    )
}

/// `Set-Cookie` headers for every marker the tracking call armed
///
/// Markers live for the throttle window and are readable by the server only.
pub(crate) fn marker_cookies(state: &AppState, client: &ClientContext) -> HeaderMap {
    let tracking = &state.config.tracking;
    let max_age = time::Duration::seconds(
        i64::try_from(state.catalog.service.throttle_window().as_secs()).unwrap_or(i64::MAX),
    );

    let mut headers = HeaderMap::new();
    for id in client.armed_markers() {
        let cookie = Cookie::build(Cookie::new(
            format!("{}{}", tracking.cookie_prefix, id),
            "1",
        ))
        .path("/")
        .max_age(max_age)
        .same_site(SameSite::Lax)
        .http_only(true)
        .secure(tracking.secure_cookies)
        .build();

        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(download_id = %id, error = %e, "Invalid marker cookie"),
        }
    }
    headers
}
