//! OpenAPI documentation and schema generation
//!
//! The specification is generated at compile time by utoipa from the
//! handler annotations.

use utoipa::OpenApi;

/// OpenAPI documentation for the downloads-catalog REST API
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
///
/// The delivery path is documented under its default route (`/download`).
#[derive(OpenApi)]
#[openapi(
    info(
        title = "downloads-catalog REST API",
        version = "0.1.0",
        description = "Faceted download listings, term management and throttled download tracking",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6789", description = "Local development server")
    ),
    paths(
        // Read API
        crate::api::routes::list_downloads,
        crate::api::routes::search_downloads,
        crate::api::routes::get_download,
        crate::api::routes::track_download,
        crate::api::routes::suggest_terms,

        // Delivery and pages
        crate::api::routes::deliver_download,
        crate::api::routes::catalog_page,
        crate::api::routes::catalog_single,

        // Admin
        crate::api::routes::admin_list_downloads,
        crate::api::routes::create_download,
        crate::api::routes::update_download,
        crate::api::routes::delete_download,
        crate::api::routes::admin_list_terms,
        crate::api::routes::register_term,
        crate::api::routes::rename_term,
        crate::api::routes::remove_term,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Records and payloads
        crate::types::DownloadId,
        crate::types::FileSource,
        crate::types::DownloadStatus,
        crate::types::DownloadRecord,
        crate::types::DownloadInput,
        crate::types::DownloadPayload,
        crate::types::TermRef,
        crate::types::TitleMatch,
        crate::types::TrackResponse,
        crate::terms::Term,
        crate::terms::TermColumn,

        // Listings
        crate::query::SortOrder,
        crate::query::Layout,
        crate::query::QueryState,
        crate::catalog::DownloadListing,
        crate::api::routes::DownloadRecordPage,

        // Requests
        crate::api::routes::RegisterTermRequest,
        crate::api::routes::RenameTermRequest,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Public listing, lookup, search and tracking"),
        (name = "terms", description = "Category and tag suggestions"),
        (name = "delivery", description = "Tracked redirect to the file"),
        (name = "catalog", description = "HTML listing pages"),
        (name = "admin", description = "Write API for downloads and terms (API key when configured)"),
        (name = "system", description = "Health check and OpenAPI spec"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security addon to add API key authentication scheme to OpenAPI spec
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_has_paths() {
        let spec = ApiDoc::openapi();

        for path in [
            "/api/v1/downloads",
            "/api/v1/downloads/{id}/track",
            "/api/v1/terms/{column}",
            "/download/{id}",
            "/catalog",
            "/api/v1/admin/terms/{column}/{slug}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn test_openapi_spec_has_components() {
        let spec = ApiDoc::openapi();

        // Verify that the spec has components (schemas) defined
        assert!(
            spec.components.is_some(),
            "OpenAPI spec should have components defined"
        );

        let components = spec.components.unwrap();
        assert!(
            !components.schemas.is_empty(),
            "OpenAPI spec should have schemas defined"
        );
    }

    #[test]
    fn test_openapi_spec_has_tags() {
        let spec = ApiDoc::openapi();

        // Verify that tags are defined
        assert!(spec.tags.is_some(), "OpenAPI spec should have tags defined");

        let tags = spec.tags.unwrap();
        assert!(
            !tags.is_empty(),
            "OpenAPI spec should have at least one tag"
        );

        // Check for expected tags
        let tag_names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert!(
            tag_names.contains(&"downloads"),
            "Should have 'downloads' tag"
        );
        assert!(tag_names.contains(&"terms"), "Should have 'terms' tag");
        assert!(tag_names.contains(&"admin"), "Should have 'admin' tag");
        assert!(tag_names.contains(&"system"), "Should have 'system' tag");
    }

    #[test]
    fn test_openapi_spec_info() {
        let spec = ApiDoc::openapi();

        // Verify basic info
        assert_eq!(spec.info.title, "downloads-catalog REST API");
        assert_eq!(spec.info.version, "0.1.0");
        assert!(spec.info.description.is_some());
    }

    #[test]
    fn test_openapi_spec_has_security_scheme() {
        let spec = ApiDoc::openapi();

        // Verify that security scheme is defined
        assert!(spec.components.is_some());
        let components = spec.components.unwrap();

        assert!(
            components.security_schemes.contains_key("api_key"),
            "Should have 'api_key' security scheme defined"
        );
    }

    #[test]
    fn test_openapi_json_serialization() {
        let spec = ApiDoc::openapi();

        // Test that the spec can be serialized to JSON
        let json = serde_json::to_string(&spec).expect("Should serialize to JSON");
        assert!(!json.is_empty(), "JSON output should not be empty");

        // Verify it's valid JSON
        let _value: serde_json::Value =
            serde_json::from_str(&json).expect("Generated JSON should be valid");
    }

    #[test]
    fn test_openapi_spec_version() {
        let spec = ApiDoc::openapi();

        // Verify OpenAPI version by serializing to JSON and checking the version field
        let json = serde_json::to_value(&spec).expect("Should serialize to JSON");
        let version = json.get("openapi").and_then(|v| v.as_str());
        assert!(version.is_some(), "Should have openapi version field");
        assert!(
            version.unwrap().starts_with("3."),
            "Should use OpenAPI 3.x version"
        );
    }
}
