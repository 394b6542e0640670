//! HTML rendering of listings and single downloads
//!
//! Templates are compiled once when the [`Renderer`] is built. Values reach
//! the markup through the `escape` formatter; only fragments the renderer
//! produced itself (cards, the results block) are inserted raw.
//!
//! Every link a card or table row shows points at the tracking URL from
//! [`DownloadService::download_url`], never at the resolved destination.

mod pagination;

pub use pagination::{PageItem, page_items, page_url};

use self::pagination::PaginationView;
use crate::config::ListingConfig;
use crate::query::{Layout, QueryState, SortOrder};
use crate::service::DownloadService;
use crate::terms::{Term, TermColumn};
use crate::text::excerpt_or_summary;
use crate::types::{DownloadRecord, DownloadStatus, QueryPage};
use crate::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use upon::{Engine, Template};

/// Words kept when a card derives its excerpt from the description
const CARD_EXCERPT_WORDS: usize = 24;

/// Renders catalog HTML
pub struct Renderer {
    engine: Engine<'static>,
    listing: Template<'static>,
    results: Template<'static>,
    card: Template<'static>,
    service: Arc<DownloadService>,
    image_size: String,
}

#[derive(Serialize)]
struct CardView {
    id: i64,
    title: String,
    excerpt: String,
    has_excerpt: bool,
    image: String,
    has_image: bool,
    categories: String,
    has_categories: bool,
    tags: String,
    has_tags: bool,
    download_url: String,
    count_label: String,
}

#[derive(Serialize)]
struct RowView {
    id: i64,
    title: String,
    categories: String,
    tags: String,
    download_count: u64,
    download_url: String,
}

#[derive(Serialize)]
struct ResultsView {
    empty: bool,
    grid: bool,
    cards: String,
    rows: Vec<RowView>,
    pagination: PaginationView,
}

#[derive(Serialize)]
struct OptionView {
    slug: String,
    name: String,
    selected: bool,
}

#[derive(Serialize)]
struct SortView {
    value: &'static str,
    label: &'static str,
    selected: bool,
}

#[derive(Serialize)]
struct ListingView {
    layout: &'static str,
    per_page: u32,
    filters: bool,
    search: String,
    categories: Vec<OptionView>,
    tags: Vec<OptionView>,
    sorts: Vec<SortView>,
    results: String,
}

impl Renderer {
    /// Compile the templates
    pub fn new(service: Arc<DownloadService>, listing: &ListingConfig) -> Result<Self> {
        let mut engine = Engine::new();
        engine.add_formatter("escape", escape_formatter);

        let compile = |engine: &Engine<'static>, name: &str, source: &'static str| {
            engine.compile(source).map_err(|e| {
                Error::Template(format!("Failed to compile {} template: {}", name, e))
            })
        };
        let listing_template = compile(&engine, "listing", include_str!("templates/listing.html"))?;
        let results = compile(&engine, "results", include_str!("templates/results.html"))?;
        let card = compile(&engine, "card", include_str!("templates/card.html"))?;

        Ok(Self {
            engine,
            listing: listing_template,
            results,
            card,
            service,
            image_size: listing.image.clone(),
        })
    }

    /// Full listing: wrapper, optional filters form, results
    ///
    /// `current_url` is used for pagination links unless the state carries a
    /// base URL of its own.
    pub async fn render_listing(
        &self,
        state: &QueryState,
        page: &QueryPage<DownloadRecord>,
        current_url: &str,
    ) -> Result<String> {
        let results = self.render_results(page, state, current_url).await?;

        let (categories, tags) = if state.filters {
            let db = self.service.database();
            (
                options(
                    db.aggregate_terms(TermColumn::Categories, Some(DownloadStatus::Publish))
                        .await?,
                    &state.category,
                ),
                options(
                    db.aggregate_terms(TermColumn::Tags, Some(DownloadStatus::Publish))
                        .await?,
                    &state.tag,
                ),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        let view = ListingView {
            layout: state.layout.as_str(),
            per_page: state.per_page,
            filters: state.filters,
            search: state.search.clone(),
            categories,
            tags,
            sorts: SortOrder::ALL
                .into_iter()
                .map(|sort| SortView {
                    value: sort.as_str(),
                    label: sort.label(),
                    selected: sort == state.sort,
                })
                .collect(),
            results,
        };

        self.render(&self.listing, "listing", &view)
    }

    /// Results block: cards or table, then pagination when there is more than one page
    pub async fn render_results(
        &self,
        page: &QueryPage<DownloadRecord>,
        state: &QueryState,
        current_url: &str,
    ) -> Result<String> {
        let base = state.base_url.as_deref().unwrap_or(current_url);
        let grid = state.layout == Layout::Grid;

        let mut cards = String::new();
        let mut rows = Vec::new();
        for record in &page.items {
            if grid {
                let view = self.card_view(record, &state.image).await?;
                cards.push_str(&self.render(&self.card, "card", &view)?);
            } else {
                rows.push(RowView {
                    id: record.id.get(),
                    title: record.title.clone(),
                    categories: record.categories.display_names(),
                    tags: record.tags.display_names(),
                    download_count: record.download_count,
                    download_url: self.service.download_url(record.id),
                });
            }
        }

        let view = ResultsView {
            empty: page.items.is_empty(),
            grid,
            cards,
            rows,
            pagination: PaginationView::build(state, page.total_pages, base),
        };

        self.render(&self.results, "results", &view)
    }

    /// A single card; empty for records that are not published
    pub async fn render_single(&self, record: &DownloadRecord) -> Result<String> {
        if !record.is_published() {
            return Ok(String::new());
        }
        let view = self.card_view(record, &self.image_size).await?;
        self.render(&self.card, "card", &view)
    }

    async fn card_view(&self, record: &DownloadRecord, image_size: &str) -> Result<CardView> {
        let image = if record.featured_image_id > 0 {
            self.service
                .assets()
                .image_url(record.featured_image_id, image_size)
                .await?
                .unwrap_or_default()
        } else {
            String::new()
        };
        let excerpt = excerpt_or_summary(&record.excerpt, &record.description, CARD_EXCERPT_WORDS);
        let categories = record.categories.display_names();
        let tags = record.tags.display_names();

        Ok(CardView {
            id: record.id.get(),
            title: record.title.clone(),
            has_excerpt: !excerpt.is_empty(),
            excerpt,
            has_image: !image.is_empty(),
            image,
            has_categories: !categories.is_empty(),
            categories,
            has_tags: !tags.is_empty(),
            tags,
            download_url: self.service.download_url(record.id),
            count_label: format!("{} downloads", record.download_count),
        })
    }

    fn render(&self, template: &Template<'static>, name: &str, view: &impl Serialize) -> Result<String> {
        template
            .render(&self.engine, view)
            .to_string()
            .map_err(|e| Error::Template(format!("Failed to render {} template: {}", name, e)))
    }
}

fn options(terms: Vec<Term>, selected: &str) -> Vec<OptionView> {
    terms
        .into_iter()
        .map(|term| OptionView {
            selected: term.slug == selected,
            slug: term.slug,
            name: term.name,
        })
        .collect()
}

/// Minimal HTML escaping for text and attribute values
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_formatter(f: &mut upon::fmt::Formatter<'_>, value: &upon::Value) -> upon::fmt::Result {
    use std::fmt::Write;

    match value {
        upon::Value::String(s) => write!(f, "{}", escape_html(s))?,
        v => upon::fmt::default(f, v)?,
    };
    Ok(())
}
