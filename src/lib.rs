//! # downloads-catalog
//!
//! A catalog of downloadable files with faceted listings, a term registry
//! and throttled download tracking.
//!
//! - **Listings** - search, category/tag facets, five sort orders and
//!   pagination, rendered as a grid of cards or a table
//! - **Terms** - comma-delimited category and tag slugs, with a registry for
//!   terms that have no members yet
//! - **Tracking** - every user-facing link goes through a delivery endpoint
//!   that counts the download (once per client per window) and redirects
//!
//! ## Quick Start
//!
//! ```no_run
//! use downloads_catalog::{Catalog, Config, DownloadInput, FileSource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Arc::new(Catalog::new(Config::default()).await?);
//!
//!     let input = DownloadInput {
//!         title: "User Guide".to_string(),
//!         file_source: FileSource::Direct,
//!         direct_url: "https://files.example.com/guide.pdf".to_string(),
//!         categories: "manuals, pdf".to_string(),
//!         ..Default::default()
//!     };
//!     input.validate()?;
//!     let id = catalog.db.save_download(&input).await?;
//!
//!     // Link users here, never straight to the file
//!     println!("{}", catalog.service.download_url(id));
//!
//!     let _server = catalog.spawn_api_server();
//!     downloads_catalog::run_with_shutdown(catalog).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Top-level catalog handle
pub mod catalog;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Listing state and filters
pub mod query;
/// HTML rendering
pub mod render;
/// Delivery, tracking and throttling
pub mod service;
/// Term slugs, sets and facets
pub mod terms;
/// Text helpers for excerpts and sanitization
pub mod text;
/// Core record types
pub mod types;

// Re-export commonly used types
pub use catalog::{Catalog, DownloadListing};
pub use config::Config;
pub use db::Database;
pub use error::{
    ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus, ValidationError,
};
pub use query::{DownloadFilters, Layout, QueryInput, QueryState, RequestContext, SortOrder};
pub use render::Renderer;
pub use service::{AssetResolver, ClientContext, DownloadService, MediaLibrary, NoAssets};
pub use terms::{Term, TermColumn, TermSet};
pub use types::{
    DownloadId, DownloadInput, DownloadPayload, DownloadRecord, DownloadStatus, FileSource,
    QueryPage, TitleMatch, TrackResponse,
};

/// Run until a termination signal arrives, then shut the catalog down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use downloads_catalog::{Catalog, Config, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let catalog = Arc::new(Catalog::new(Config::default()).await?);
///     let _server = catalog.spawn_api_server();
///
///     run_with_shutdown(catalog).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(catalog: std::sync::Arc<Catalog>) -> Result<()> {
    wait_for_signal().await;
    catalog.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
