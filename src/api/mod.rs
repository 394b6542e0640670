//! REST API server module
//!
//! Serves the public read API, the delivery endpoint, the HTML catalog pages
//! and the (optionally API-key gated) write API.

use crate::{Catalog, Result};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Read API
/// - `GET /api/v1/downloads` - Filtered, sorted, paginated listing
/// - `GET /api/v1/downloads/search` - Title autocomplete
/// - `GET /api/v1/downloads/:id` - Single download payload
/// - `POST /api/v1/downloads/:id/track` - Record a download
/// - `GET /api/v1/terms/:column` - Category/tag suggestions
///
/// ## Delivery and pages
/// - `GET /{route}/:id` - Track and redirect to the file
/// - `GET /catalog` - HTML listing
/// - `GET /catalog/:id` - HTML card for one download
///
/// ## Admin (API key required when configured)
/// - `GET /api/v1/admin/downloads` - Listing over any status
/// - `POST /api/v1/admin/downloads` - Create
/// - `PUT /api/v1/admin/downloads/:id` - Update
/// - `DELETE /api/v1/admin/downloads/:id` - Delete
/// - `GET /api/v1/admin/terms/:column` - Facet counts over any status
/// - `POST /api/v1/admin/terms/:column` - Register a term
/// - `PUT /api/v1/admin/terms/:column/:slug` - Rename a term
/// - `DELETE /api/v1/admin/terms/:column/:slug` - Remove a term
///
/// ## System
/// - `GET /api/v1/health` - Health check
/// - `GET /api/v1/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(catalog: Arc<Catalog>) -> Router {
    let state = AppState::new(catalog);
    let config = state.config.clone();
    let delivery_path = format!("/{}/:id", config.delivery.route_segment());

    let public = Router::new()
        // Read API
        .route("/api/v1/downloads", get(routes::list_downloads))
        .route("/api/v1/downloads/search", get(routes::search_downloads))
        .route("/api/v1/downloads/:id", get(routes::get_download))
        .route("/api/v1/downloads/:id/track", post(routes::track_download))
        .route("/api/v1/terms/:column", get(routes::suggest_terms))
        // Delivery and pages
        .route(&delivery_path, get(routes::deliver_download))
        .route("/catalog", get(routes::catalog_page))
        .route("/catalog/:id", get(routes::catalog_single))
        // System
        .route("/api/v1/health", get(routes::health_check))
        .route("/api/v1/openapi.json", get(routes::openapi_spec));

    let admin = Router::new()
        .route("/api/v1/admin/downloads", get(routes::admin_list_downloads))
        .route("/api/v1/admin/downloads", post(routes::create_download))
        .route("/api/v1/admin/downloads/:id", put(routes::update_download))
        .route("/api/v1/admin/downloads/:id", delete(routes::delete_download))
        .route("/api/v1/admin/terms/:column", get(routes::admin_list_terms))
        .route("/api/v1/admin/terms/:column", post(routes::register_term))
        .route("/api/v1/admin/terms/:column/:slug", put(routes::rename_term))
        .route("/api/v1/admin/terms/:column/:slug", delete(routes::remove_term));

    // Only the write API is gated; public reads and delivery stay open
    let admin = if config.server.api.api_key.is_some() {
        admin.route_layer(middleware::from_fn_with_state(
            config.server.api.api_key.clone(),
            auth::require_api_key,
        ))
    } else {
        admin
    };

    let router = public.merge(admin);

    // Served from its own path so it never shadows /api/v1/openapi.json
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state);

    let router = if config.server.api.cors_enabled {
        router.layer(build_cors_layer(&config.server.api.cors_origins))
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins that parse as header values are allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops, either due to an error or shutdown.
///
/// # Example
///
/// ```no_run
/// use downloads_catalog::{Catalog, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = Arc::new(Catalog::new(Config::default()).await?);
///
/// // Start API server (blocks until shutdown)
/// downloads_catalog::api::start_api_server(catalog).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(catalog: Arc<Catalog>) -> Result<()> {
    let bind_address = catalog.config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(catalog);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    // ConnectInfo<SocketAddr> feeds the client IP used for throttling
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
