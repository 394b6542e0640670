//! Top-level catalog handle

use crate::config::Config;
use crate::db::Database;
use crate::query::{BuiltQuery, QueryInput, QueryState, RequestContext};
use crate::render::Renderer;
use crate::service::{AssetResolver, DownloadService, MediaLibrary};
use crate::types::{DownloadPayload, DownloadRecord, QueryPage};
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Listing as served by the read API: payloads, the rendered results block
/// and pagination metadata
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct DownloadListing {
    /// Records on this page
    pub items: Vec<DownloadPayload>,
    /// Rendered results block (cards or table plus pagination)
    pub html: String,
    /// Current page
    pub page: u32,
    /// Page size
    pub per_page: u32,
    /// Number of matching records
    pub total: u64,
    /// Number of pages
    pub total_pages: u32,
    /// Canonical state the listing was built from
    pub state: QueryState,
}

/// Owns the store, the download service and the renderer
///
/// # Example
///
/// ```no_run
/// use downloads_catalog::{Catalog, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = Arc::new(Catalog::new(Config::default()).await?);
/// let server = catalog.spawn_api_server();
/// # server.abort();
/// # Ok(())
/// # }
/// ```
pub struct Catalog {
    /// Persistence layer
    pub db: Arc<Database>,
    /// Delivery and tracking
    pub service: Arc<DownloadService>,
    /// HTML rendering
    pub renderer: Arc<Renderer>,
    /// Validated configuration
    pub config: Arc<Config>,
}

impl Catalog {
    /// Open the catalog with the built-in media library as asset resolver
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        let assets: Arc<dyn AssetResolver> = Arc::new(MediaLibrary::new(db.clone()));
        Self::assemble(config, db, assets)
    }

    /// Open the catalog with a caller-supplied asset resolver
    pub async fn with_assets(config: Config, assets: Arc<dyn AssetResolver>) -> Result<Self> {
        config.validate()?;
        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        Self::assemble(config, db, assets)
    }

    fn assemble(config: Config, db: Arc<Database>, assets: Arc<dyn AssetResolver>) -> Result<Self> {
        tracing::info!(assets = assets.name(), "Opening downloads catalog");
        let service = Arc::new(DownloadService::new(db.clone(), assets, &config));
        let renderer = Arc::new(Renderer::new(service.clone(), &config.listing)?);

        Ok(Self {
            db,
            service,
            renderer,
            config: Arc::new(config),
        })
    }

    /// Build the state for a listing and run its query
    pub async fn query(
        &self,
        input: &QueryInput,
        request: Option<&RequestContext>,
    ) -> Result<(QueryState, QueryPage<DownloadRecord>)> {
        let BuiltQuery { state, filters } = QueryState::build(input, request);
        let page = self.db.query_downloads(&filters).await?;
        Ok((state, page))
    }

    /// Listing for programmatic clients
    ///
    /// Built from `input` alone (the request is never merged) with the
    /// filters form hidden. `context_url` becomes the base for pagination
    /// links; without it links point at `fallback_url`.
    pub async fn listing(
        &self,
        input: &QueryInput,
        context_url: Option<&str>,
        fallback_url: &str,
    ) -> Result<DownloadListing> {
        let input = QueryInput {
            filters: Some(false),
            ..input.clone()
        };
        let (mut state, page) = self.query(&input, None).await?;
        if let Some(url) = context_url {
            state = state.with_base_url(url);
        }

        let html = self
            .renderer
            .render_results(&page, &state, fallback_url)
            .await?;

        let mut items = Vec::with_capacity(page.items.len());
        for record in &page.items {
            items.push(self.service.payload(record).await?);
        }

        Ok(DownloadListing {
            items,
            html,
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            total_pages: page.total_pages,
            state,
        })
    }

    /// Full HTML listing for a browser request
    ///
    /// Configured listing defaults are the baseline and the navigable
    /// parameters of `query_string` override them.
    pub async fn listing_page(&self, query_string: &str, current_url: &str) -> Result<String> {
        let input = QueryInput::from_listing(&self.config.listing);
        let request = RequestContext::from_query_string(query_string);
        let (state, page) = self.query(&input, Some(&request)).await?;
        self.renderer.render_listing(&state, &page, current_url).await
    }

    /// Spawn the API server in a background task
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let catalog = self.clone();
        tokio::spawn(async move { crate::api::start_api_server(catalog).await })
    }

    /// Drop expired throttle marks and close the store
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down downloads catalog");

        let now = chrono::Utc::now().timestamp_millis();
        match self.db.purge_expired_throttle_marks(now).await {
            Ok(purged) => tracing::debug!(purged, "Purged expired throttle marks"),
            Err(e) => tracing::warn!(error = %e, "Failed to purge throttle marks during shutdown"),
        }

        self.db.pool().close().await;
        tracing::info!("Database closed");
        Ok(())
    }
}
