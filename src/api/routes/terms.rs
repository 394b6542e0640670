//! Category and tag suggestions.

use super::{SuggestQuery, parse_number};
use crate::Result;
use crate::api::AppState;
use crate::terms::{Term, TermColumn};
use axum::{
    Json,
    extract::{Path, Query, State},
};

const DEFAULT_SUGGESTIONS: i64 = 10;

/// GET /terms/:column - Autocomplete over categories or tags
#[utoipa::path(
    get,
    path = "/api/v1/terms/{column}",
    tag = "terms",
    params(
        ("column" = String, Path, description = "categories or tags"),
        ("search" = Option<String>, Query, description = "Text matched against slug and display name"),
        ("per_page" = Option<i64>, Query, description = "Maximum results, 1..=50 (default: 10)")
    ),
    responses(
        (status = 200, description = "Matching terms sorted by slug", body = Vec<Term>),
        (status = 404, description = "Unknown term column", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn suggest_terms(
    State(state): State<AppState>,
    Path(column): Path<String>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<Vec<Term>>> {
    let column: TermColumn = column.parse()?;
    let limit = parse_number(query.per_page.as_deref())
        .unwrap_or(DEFAULT_SUGGESTIONS)
        .max(1);

    let terms = state
        .catalog
        .db
        .suggest_terms(
            column,
            query.search.as_deref().unwrap_or_default(),
            usize::try_from(limit).unwrap_or(usize::MAX),
        )
        .await?;
    Ok(Json(terms))
}
