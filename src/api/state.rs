//! Application state for the API server

use crate::{Catalog, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// Store, download service and renderer
    pub catalog: Arc<Catalog>,

    /// Validated configuration (same instance the catalog holds)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let config = catalog.config.clone();
        Self { catalog, config }
    }
}
