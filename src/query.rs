//! Listing query state
//!
//! [`QueryState::build`] turns caller defaults ([`QueryInput`]) and, when the
//! caller passes one, the navigable request parameters ([`RequestContext`])
//! into a canonical [`QueryState`] plus the [`DownloadFilters`] handed to the
//! repository.
//!
//! Invalid input never errors. Unknown sorts become `newest`, out-of-range
//! page sizes become 12 or 50, unknown layouts become `grid`.
//!
//! The request context only ever contributes `search`, `category`, `tag`,
//! `sort` and `page`. Page size, layout, filter visibility and image size
//! are presentation settings and always come from the caller.

use crate::config::ListingConfig;
use crate::terms::normalize_slug;
use crate::text::sanitize_text;
use crate::types::DownloadStatus;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Page size used when none (or a non-positive one) is given
pub const DEFAULT_PER_PAGE: u32 = 12;

/// Largest accepted page size
pub const MAX_PER_PAGE: u32 = 50;

/// Listing sort order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// `created_at` descending
    #[default]
    Newest,
    /// `created_at` ascending
    Oldest,
    /// `download_count` descending
    Popular,
    /// `title` A-Z
    TitleAsc,
    /// `title` Z-A
    TitleDesc,
}

impl SortOrder {
    /// Every sort order, in the order the filters form lists them
    pub const ALL: [SortOrder; 5] = [
        SortOrder::Newest,
        SortOrder::Oldest,
        SortOrder::Popular,
        SortOrder::TitleAsc,
        SortOrder::TitleDesc,
    ];

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::Popular => "popular",
            SortOrder::TitleAsc => "title_asc",
            SortOrder::TitleDesc => "title_desc",
        }
    }

    /// Label shown in the sort select
    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Newest => "Newest first",
            SortOrder::Oldest => "Oldest first",
            SortOrder::Popular => "Most downloaded",
            SortOrder::TitleAsc => "Title A-Z",
            SortOrder::TitleDesc => "Title Z-A",
        }
    }

    /// Parse, falling back to `Newest` for anything unrecognized
    pub fn parse_lossy(raw: &str) -> Self {
        let key = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == key)
            .unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lossy(&raw))
    }
}

/// Listing layout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Card grid
    #[default]
    Grid,
    /// Table with one row per download
    Table,
}

impl Layout {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Grid => "grid",
            Layout::Table => "table",
        }
    }

    /// Parse, falling back to `Grid` for anything unrecognized
    pub fn parse_lossy(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "table" => Layout::Table,
            _ => Layout::Grid,
        }
    }
}

impl<'de> Deserialize<'de> for Layout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lossy(&raw))
    }
}

/// Caller-supplied listing settings (the baseline)
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct QueryInput {
    /// Free-text search
    pub search: Option<String>,
    /// Category slug
    pub category: Option<String>,
    /// Tag slug
    pub tag: Option<String>,
    /// Sort key
    pub sort: Option<String>,
    /// 1-based page
    pub page: Option<i64>,
    /// Page size
    pub per_page: Option<i64>,
    /// `grid` or `table`
    pub layout: Option<String>,
    /// Whether to render the filters form
    pub filters: Option<bool>,
    /// Image size key for card thumbnails
    pub image: Option<String>,
}

impl QueryInput {
    /// Baseline taken from the configured listing defaults
    pub fn from_listing(listing: &ListingConfig) -> Self {
        Self {
            per_page: Some(listing.per_page),
            layout: Some(listing.layout.as_str().to_string()),
            filters: Some(listing.filters),
            image: Some(listing.image.clone()),
            ..Default::default()
        }
    }
}

/// Navigable parameters taken from the request URL
///
/// Everything is kept as raw text so malformed values fall back silently
/// instead of rejecting the request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RequestContext {
    /// `search` parameter
    pub search: Option<String>,
    /// `category` parameter
    pub category: Option<String>,
    /// `tag` parameter
    pub tag: Option<String>,
    /// `sort` parameter
    pub sort: Option<String>,
    /// `page` parameter
    pub page: Option<String>,
}

impl RequestContext {
    /// Build a context from a raw (undecoded) query string
    pub fn from_query_string(query: &str) -> Self {
        let mut context = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "search" => context.search = value,
                "category" => context.category = value,
                "tag" => context.tag = value,
                "sort" => context.sort = value,
                "page" => context.page = value,
                _ => {}
            }
        }
        context
    }
}

/// Canonical listing state for one request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct QueryState {
    /// Free-text search (sanitized)
    pub search: String,
    /// Category slug (normalized)
    pub category: String,
    /// Tag slug (normalized)
    pub tag: String,
    /// Sort order
    pub sort: SortOrder,
    /// 1-based page
    pub page: u32,
    /// Page size, 1..=50
    pub per_page: u32,
    /// Layout
    pub layout: Layout,
    /// Whether the filters form is shown
    pub filters: bool,
    /// Image size key
    pub image: String,
    /// URL pagination links are built from; the current URL when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Filters executed by the repository
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadFilters {
    /// Substring matched against title, description and excerpt
    pub search: String,
    /// Category slug the record must contain
    pub category: String,
    /// Tag slug the record must contain
    pub tag: String,
    /// Sort order
    pub sort: SortOrder,
    /// 1-based page (clamped to >= 1 by the repository)
    pub page: i64,
    /// Page size (clamped to 1..=50 by the repository)
    pub per_page: i64,
    /// Exact status, or any status when `None`
    pub status: Option<DownloadStatus>,
}

impl Default for DownloadFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: String::new(),
            tag: String::new(),
            sort: SortOrder::Newest,
            page: 1,
            per_page: DEFAULT_PER_PAGE as i64,
            status: Some(DownloadStatus::Publish),
        }
    }
}

/// Result of [`QueryState::build`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltQuery {
    /// Canonical state (presentation + navigation)
    pub state: QueryState,
    /// Repository filters, always restricted to published records
    pub filters: DownloadFilters,
}

impl QueryState {
    /// Merge caller defaults with an optional request context.
    ///
    /// With `request = None` the input alone decides the state. With a
    /// context, its non-empty `search`/`category`/`tag`/`sort` override the
    /// input, and `page` overrides it only when it is a positive integer.
    pub fn build(input: &QueryInput, request: Option<&RequestContext>) -> BuiltQuery {
        let mut state = QueryState {
            search: input.search.as_deref().map(sanitize_text).unwrap_or_default(),
            category: input
                .category
                .as_deref()
                .map(normalize_slug)
                .unwrap_or_default(),
            tag: input.tag.as_deref().map(normalize_slug).unwrap_or_default(),
            sort: input
                .sort
                .as_deref()
                .map(SortOrder::parse_lossy)
                .unwrap_or_default(),
            page: input.page.map(clamp_page).unwrap_or(1),
            per_page: sanitize_per_page(input.per_page),
            layout: input
                .layout
                .as_deref()
                .map(Layout::parse_lossy)
                .unwrap_or_default(),
            filters: input.filters.unwrap_or(true),
            image: input
                .image
                .as_deref()
                .map(sanitize_key)
                .filter(|image| !image.is_empty())
                .unwrap_or_else(|| "medium".to_string()),
            base_url: None,
        };

        if let Some(request) = request {
            state.merge_request(request);
        }

        let filters = DownloadFilters {
            search: state.search.clone(),
            category: state.category.clone(),
            tag: state.tag.clone(),
            sort: state.sort,
            page: state.page as i64,
            per_page: state.per_page as i64,
            status: Some(DownloadStatus::Publish),
        };

        BuiltQuery { state, filters }
    }

    fn merge_request(&mut self, request: &RequestContext) {
        if let Some(search) = request.search.as_deref().map(sanitize_text)
            && !search.is_empty()
        {
            self.search = search;
        }
        if let Some(category) = request.category.as_deref().map(normalize_slug)
            && !category.is_empty()
        {
            self.category = category;
        }
        if let Some(tag) = request.tag.as_deref().map(normalize_slug)
            && !tag.is_empty()
        {
            self.tag = tag;
        }
        if let Some(sort) = request.sort.as_deref()
            && !sort.trim().is_empty()
        {
            self.sort = SortOrder::parse_lossy(sort);
        }
        if let Some(page) = request.page.as_deref().and_then(|p| p.trim().parse::<i64>().ok())
            && page > 0
        {
            self.page = clamp_page(page);
        }
    }

    /// Use `url` as the base for pagination links
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }

    /// Navigable parameters that differ from their defaults, in URL order.
    ///
    /// Page is not included; pagination adds it per link.
    pub fn navigation_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.search.is_empty() {
            params.push(("search", self.search.clone()));
        }
        if !self.category.is_empty() {
            params.push(("category", self.category.clone()));
        }
        if !self.tag.is_empty() {
            params.push(("tag", self.tag.clone()));
        }
        if self.sort != SortOrder::Newest {
            params.push(("sort", self.sort.as_str().to_string()));
        }
        params
    }
}

fn clamp_page(page: i64) -> u32 {
    page.clamp(1, u32::MAX as i64) as u32
}

fn sanitize_per_page(per_page: Option<i64>) -> u32 {
    match per_page {
        Some(n) if n >= 1 => n.min(MAX_PER_PAGE as i64) as u32,
        _ => DEFAULT_PER_PAGE,
    }
}

/// Lowercase key made of `[a-z0-9_-]` only
fn sanitize_key(raw: &str) -> String {
    raw.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &str) -> RequestContext {
        RequestContext::from_query_string(query)
    }

    #[test]
    fn defaults_without_input() {
        let built = QueryState::build(&QueryInput::default(), None);

        assert_eq!(built.state.search, "");
        assert_eq!(built.state.sort, SortOrder::Newest);
        assert_eq!(built.state.page, 1);
        assert_eq!(built.state.per_page, 12);
        assert_eq!(built.state.layout, Layout::Grid);
        assert!(built.state.filters);
        assert_eq!(built.state.image, "medium");
        assert_eq!(built.filters.status, Some(DownloadStatus::Publish));
    }

    #[test]
    fn invalid_values_fall_back_silently() {
        let input = QueryInput {
            sort: Some("random".into()),
            per_page: Some(0),
            layout: Some("carousel".into()),
            page: Some(-4),
            ..Default::default()
        };
        let built = QueryState::build(&input, None);

        assert_eq!(built.state.sort, SortOrder::Newest);
        assert_eq!(built.state.per_page, 12);
        assert_eq!(built.state.layout, Layout::Grid);
        assert_eq!(built.state.page, 1);
    }

    #[test]
    fn per_page_is_capped() {
        let input = QueryInput {
            per_page: Some(500),
            ..Default::default()
        };
        assert_eq!(QueryState::build(&input, None).state.per_page, 50);
    }

    #[test]
    fn input_values_are_sanitized() {
        let input = QueryInput {
            search: Some("  <b>user</b>   guide ".into()),
            category: Some("How To".into()),
            tag: Some(" PDF ".into()),
            sort: Some("TITLE_DESC".into()),
            image: Some("Large!".into()),
            ..Default::default()
        };
        let built = QueryState::build(&input, None);

        assert_eq!(built.state.search, "user guide");
        assert_eq!(built.state.category, "how-to");
        assert_eq!(built.state.tag, "pdf");
        assert_eq!(built.state.sort, SortOrder::TitleDesc);
        assert_eq!(built.state.image, "large");
        assert_eq!(built.filters.category, "how-to");
    }

    #[test]
    fn request_overrides_navigable_values() {
        let input = QueryInput {
            search: Some("base".into()),
            category: Some("docs".into()),
            sort: Some("oldest".into()),
            page: Some(2),
            ..Default::default()
        };
        let ctx = request("search=override&category=Video&tag=hd&sort=popular&page=4");
        let built = QueryState::build(&input, Some(&ctx));

        assert_eq!(built.state.search, "override");
        assert_eq!(built.state.category, "video");
        assert_eq!(built.state.tag, "hd");
        assert_eq!(built.state.sort, SortOrder::Popular);
        assert_eq!(built.state.page, 4);
        assert_eq!(built.filters.page, 4);
    }

    #[test]
    fn request_never_overrides_presentation_values() {
        let input = QueryInput {
            per_page: Some(5),
            layout: Some("table".into()),
            filters: Some(false),
            image: Some("thumbnail".into()),
            ..Default::default()
        };
        let ctx = request("per_page=40&layout=grid&filters=1&image=full");
        let built = QueryState::build(&input, Some(&ctx));

        assert_eq!(built.state.per_page, 5);
        assert_eq!(built.state.layout, Layout::Table);
        assert!(!built.state.filters);
        assert_eq!(built.state.image, "thumbnail");
    }

    #[test]
    fn empty_and_non_positive_request_values_are_ignored() {
        let input = QueryInput {
            search: Some("keep".into()),
            category: Some("docs".into()),
            page: Some(3),
            ..Default::default()
        };
        for query in ["search=&category=&page=0", "page=-2", "page=abc", "category=%20%21"] {
            let built = QueryState::build(&input, Some(&request(query)));
            assert_eq!(built.state.search, "keep", "query {query}");
            assert_eq!(built.state.category, "docs", "query {query}");
            assert_eq!(built.state.page, 3, "query {query}");
        }
    }

    #[test]
    fn invalid_request_sort_falls_back_to_newest() {
        let input = QueryInput {
            sort: Some("oldest".into()),
            ..Default::default()
        };
        let built = QueryState::build(&input, Some(&request("sort=sideways")));
        assert_eq!(built.state.sort, SortOrder::Newest);
    }

    #[test]
    fn context_is_ignored_when_not_passed() {
        let input = QueryInput {
            search: Some("base".into()),
            ..Default::default()
        };
        let built = QueryState::build(&input, None);
        assert_eq!(built.state.search, "base");
    }

    #[test]
    fn from_listing_uses_config_defaults() {
        let listing = ListingConfig {
            per_page: 24,
            layout: Layout::Table,
            filters: false,
            image: "thumbnail".into(),
        };
        let built = QueryState::build(&QueryInput::from_listing(&listing), None);
        assert_eq!(built.state.per_page, 24);
        assert_eq!(built.state.layout, Layout::Table);
        assert!(!built.state.filters);
        assert_eq!(built.state.image, "thumbnail");
    }

    #[test]
    fn navigation_params_skip_defaults() {
        let input = QueryInput {
            category: Some("docs".into()),
            ..Default::default()
        };
        let state = QueryState::build(&input, None).state;
        assert_eq!(
            state.navigation_params(),
            vec![("category", "docs".to_string())]
        );

        let input = QueryInput {
            search: Some("a b".into()),
            tag: Some("x".into()),
            sort: Some("popular".into()),
            ..Default::default()
        };
        let state = QueryState::build(&input, None).state;
        assert_eq!(
            state.navigation_params(),
            vec![
                ("search", "a b".to_string()),
                ("tag", "x".to_string()),
                ("sort", "popular".to_string()),
            ]
        );
    }

    #[test]
    fn with_base_url_ignores_blank() {
        let state = QueryState::build(&QueryInput::default(), None).state;
        assert_eq!(state.clone().with_base_url("  ").base_url, None);
        assert_eq!(
            state.with_base_url("https://site.test/list").base_url.as_deref(),
            Some("https://site.test/list")
        );
    }

    #[test]
    fn sort_order_round_trip_and_labels() {
        for sort in SortOrder::ALL {
            assert_eq!(SortOrder::parse_lossy(sort.as_str()), sort);
            assert!(!sort.label().is_empty());
        }
        let parsed: SortOrder = serde_json::from_str("\"nope\"").unwrap();
        assert_eq!(parsed, SortOrder::Newest);
    }
}
