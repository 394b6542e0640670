//! Pagination links for listings

use crate::query::QueryState;
use serde::Serialize;
use url::Url;

/// Parameters owned by the listing; stripped from the base URL before links are rebuilt
const LISTING_PARAMS: [&str; 6] = ["search", "category", "tag", "sort", "page", "paged"];

/// Pages shown on each side of the current page
const WINDOW: u32 = 2;

/// One entry in the numbered part of the pagination bar
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageItem {
    /// A page number
    Page(u32),
    /// Skipped range, rendered as `…`
    Gap,
}

/// Page numbers to show: first, last, and `current ± 2`, with gaps between
pub fn page_items(current: u32, total_pages: u32) -> Vec<PageItem> {
    if total_pages == 0 {
        return Vec::new();
    }

    let current = current.clamp(1, total_pages);
    let mut pages = vec![1, total_pages];
    pages.extend(current.saturating_sub(WINDOW).max(1)..=current.saturating_add(WINDOW).min(total_pages));
    pages.sort_unstable();
    pages.dedup();

    let mut items = Vec::with_capacity(pages.len() + 2);
    let mut previous = 0;
    for page in pages {
        if previous != 0 && page > previous + 1 {
            items.push(PageItem::Gap);
        }
        items.push(PageItem::Page(page));
        previous = page;
    }
    items
}

/// URL of `page`, keeping every active filter of `state`
///
/// Listing parameters already on `base` are dropped and re-applied from the
/// state, so stale values from the current URL never leak into links.
/// Relative bases stay relative.
pub fn page_url(base: &str, state: &QueryState, page: u32) -> String {
    let (mut url, relative) = match Url::parse(base) {
        Ok(url) => (url, false),
        Err(_) => match Url::parse("http://localhost/").and_then(|root| root.join(base)) {
            Ok(url) => (url, true),
            Err(e) => {
                tracing::warn!(base, error = %e, "Unusable pagination base URL");
                let mut query = url::form_urlencoded::Serializer::new(String::new());
                query.extend_pairs(state.navigation_params());
                query.append_pair("page", &page.to_string());
                return format!("?{}", query.finish());
            }
        },
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !LISTING_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .extend_pairs(state.navigation_params())
        .append_pair("page", &page.to_string());

    if relative {
        format!("{}?{}", url.path(), url.query().unwrap_or_default())
    } else {
        url.to_string()
    }
}

/// Numbered link as handed to the template
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageLinkView {
    pub label: String,
    pub url: String,
    pub current: bool,
    pub gap: bool,
}

/// Whole pagination bar as handed to the template
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PaginationView {
    pub show: bool,
    pub has_prev: bool,
    pub prev: String,
    pub has_next: bool,
    pub next: String,
    pub pages: Vec<PageLinkView>,
}

impl PaginationView {
    /// Build the bar; hidden unless there is more than one page
    pub fn build(state: &QueryState, total_pages: u32, base: &str) -> Self {
        if total_pages <= 1 {
            return Self::default();
        }

        let current = state.page.clamp(1, total_pages);
        let pages = page_items(current, total_pages)
            .into_iter()
            .map(|item| match item {
                PageItem::Page(page) => PageLinkView {
                    label: page.to_string(),
                    url: page_url(base, state, page),
                    current: page == current,
                    gap: false,
                },
                PageItem::Gap => PageLinkView {
                    label: "…".to_string(),
                    url: String::new(),
                    current: false,
                    gap: true,
                },
            })
            .collect();

        Self {
            show: true,
            has_prev: current > 1,
            prev: if current > 1 {
                page_url(base, state, current - 1)
            } else {
                String::new()
            },
            has_next: current < total_pages,
            next: if current < total_pages {
                page_url(base, state, current + 1)
            } else {
                String::new()
            },
            pages,
        }
    }
}
