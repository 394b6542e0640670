//! Delivery endpoint: count the download, then send the client to the file.
//!
//! Lookup, status check and resolution all end in a 404 page when they fail.
//! Tracking never blocks the redirect: its errors are logged and the client is
//! still sent on.

use super::{client_context, marker_cookies, parse_download_id};
use crate::api::AppState;
use crate::render::escape_html;
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::LOCATION},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::net::SocketAddr;

const NOT_FOUND_MESSAGE: &str = "Download not found.";
const UNAVAILABLE_MESSAGE: &str = "This download is currently unavailable.";

/// GET /{route}/:id - Tracked redirect to the resolved file
#[utoipa::path(
    get,
    path = "/download/{id}",
    tag = "delivery",
    params(
        ("id" = i64, Path, description = "Download ID")
    ),
    responses(
        (status = 302, description = "Redirect to the file; marker cookies are set for the throttle window"),
        (status = 404, description = "Download not found, not published or without a resolvable file (HTML page)")
    )
)]
pub async fn deliver_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    let Ok(id) = parse_download_id(&id) else {
        return not_found_page(NOT_FOUND_MESSAGE);
    };
    let service = &state.catalog.service;

    let record = match service.find_published(id).await {
        Ok(Some(record)) => record,
        Ok(None) => return not_found_page(NOT_FOUND_MESSAGE),
        Err(e) => return e.into_response(),
    };

    let destination = match service.resolve_record(&record).await {
        Ok(Some(url)) => url,
        Ok(None) => {
            tracing::warn!(download_id = %id, "Download has no resolvable file");
            return not_found_page(UNAVAILABLE_MESSAGE);
        }
        Err(e) => return e.into_response(),
    };

    let Ok(location) = HeaderValue::from_str(&destination) else {
        tracing::warn!(download_id = %id, destination = %destination, "Destination is not a valid header value");
        return not_found_page(UNAVAILABLE_MESSAGE);
    };

    let mut client = client_context(&state, &headers, connect_info.map(|c| c.0), &jar);
    if let Err(e) = service.track_download(id, &mut client).await {
        tracing::warn!(download_id = %id, error = %e, "Tracking failed, redirecting anyway");
    }

    let mut response_headers = marker_cookies(&state, &client);
    response_headers.insert(LOCATION, location);
    (StatusCode::FOUND, response_headers).into_response()
}

fn not_found_page(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(format!(
            "<!doctype html><html><head><title>Not found</title></head><body><p>{}</p></body></html>",
            escape_html(message)
        )),
    )
        .into_response()
}
