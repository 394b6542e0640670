//! Configuration types for downloads-catalog

use crate::error::{Error, Result};
use crate::query::Layout;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// First path segments already taken by the HTTP surface
const RESERVED_ROUTES: [&str; 3] = ["api", "catalog", "swagger-ui"];

/// Main configuration for downloads-catalog
///
/// Fields are organized into sub-configs:
/// - [`persistence`](PersistenceConfig) — database location
/// - [`listing`](ListingConfig) — presentation defaults for listings
/// - [`tracking`](TrackingConfig) — throttle window, client markers, proxy header
/// - [`delivery`](DeliveryConfig) — public URL and route of the delivery endpoint
/// - [`server`](ServerIntegrationConfig) — REST API settings
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Listing presentation defaults
    #[serde(default)]
    pub listing: ListingConfig,

    /// Download tracking and throttling
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Delivery endpoint
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load a configuration from a JSON file
    pub async fn from_json_file(path: &std::path::Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde defaults cannot guard
    pub fn validate(&self) -> Result<()> {
        if self.tracking.throttle_window.is_zero() {
            return Err(Error::Config {
                message: "throttle window must be at least one second".to_string(),
                key: Some("tracking.throttle_window".to_string()),
            });
        }

        let route = self.delivery.route_segment();
        if route.is_empty() {
            return Err(Error::Config {
                message: "delivery route must not be empty".to_string(),
                key: Some("delivery.route".to_string()),
            });
        }
        let first_segment = route.split('/').next().unwrap_or_default();
        if RESERVED_ROUTES.contains(&first_segment) || route.contains(':') || route.contains('*') {
            return Err(Error::Config {
                message: format!("delivery route '{}' collides with a built-in route", route),
                key: Some("delivery.route".to_string()),
            });
        }

        if url::Url::parse(&self.delivery.public_url).is_err() {
            return Err(Error::Config {
                message: format!(
                    "public URL '{}' is not an absolute URL",
                    self.delivery.public_url
                ),
                key: Some("delivery.public_url".to_string()),
            });
        }

        if !(1..=50).contains(&self.listing.per_page) {
            return Err(Error::Config {
                message: format!("per_page must be between 1 and 50, got {}", self.listing.per_page),
                key: Some("listing.per_page".to_string()),
            });
        }

        Ok(())
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./downloads-catalog.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Presentation defaults applied to listings that don't specify their own
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListingConfig {
    /// Items per page (default: 12)
    #[serde(default = "default_per_page")]
    pub per_page: i64,

    /// Grid or table (default: grid)
    #[serde(default)]
    pub layout: Layout,

    /// Show the filters form above listings (default: true)
    #[serde(default = "default_true")]
    pub filters: bool,

    /// Image size key for card thumbnails (default: "medium")
    #[serde(default = "default_image_size")]
    pub image: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            layout: Layout::default(),
            filters: true,
            image: default_image_size(),
        }
    }
}

/// Download tracking configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TrackingConfig {
    /// Window in which repeat downloads by the same client are not counted (default: 600s)
    #[serde(with = "duration_serde", default = "default_throttle_window")]
    #[schema(value_type = u64)]
    pub throttle_window: Duration,

    /// Header set by a trusted reverse proxy carrying the client IP
    /// (default: "cf-connecting-ip")
    #[serde(default = "default_trusted_proxy_header")]
    pub trusted_proxy_header: Option<String>,

    /// Name prefix for the per-download marker cookie (default: "dlcat_dl_")
    #[serde(default = "default_cookie_prefix")]
    pub cookie_prefix: String,

    /// Mark marker cookies `Secure` (default: false)
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            throttle_window: default_throttle_window(),
            trusted_proxy_header: default_trusted_proxy_header(),
            cookie_prefix: default_cookie_prefix(),
            secure_cookies: false,
        }
    }
}

/// Delivery endpoint configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DeliveryConfig {
    /// Public base URL used when building tracking links (default: "http://127.0.0.1:6789")
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Path segment of the delivery endpoint (default: "download")
    #[serde(default = "default_delivery_route")]
    pub route: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            public_url: default_public_url(),
            route: default_delivery_route(),
        }
    }
}

impl DeliveryConfig {
    /// Route segment without surrounding slashes
    pub fn route_segment(&self) -> &str {
        self.route.trim_matches('/')
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6789)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// API key required for write routes; `None` leaves them open
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./downloads-catalog.db")
}

fn default_per_page() -> i64 {
    12
}

fn default_true() -> bool {
    true
}

fn default_image_size() -> String {
    "medium".to_string()
}

fn default_throttle_window() -> Duration {
    Duration::from_secs(600)
}

fn default_trusted_proxy_header() -> Option<String> {
    Some("cf-connecting-ip".to_string())
}

fn default_cookie_prefix() -> String {
    "dlcat_dl_".to_string()
}

fn default_public_url() -> String {
    "http://127.0.0.1:6789".to_string()
}

fn default_delivery_route() -> String {
    "download".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6789))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
