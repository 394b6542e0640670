use super::*;
use crate::Config;
use crate::types::{DownloadId, DownloadInput, DownloadStatus, FileSource};
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;


/// Catalog on a fresh database; the directory lives as long as the fixture
struct TestApp {
    _dir: TempDir,
    catalog: Arc<Catalog>,
}

impl TestApp {
    fn router(&self) -> Router {
        create_router(self.catalog.clone())
    }

    async fn add(&self, title: &str, categories: &str, tags: &str) -> DownloadId {
        self.add_input(DownloadInput {
            title: title.to_string(),
            file_source: FileSource::Direct,
            direct_url: format!(
                "https://files.example.com/{}.pdf",
                crate::terms::normalize_slug(title)
            ),
            categories: categories.to_string(),
            tags: tags.to_string(),
            ..Default::default()
        })
        .await
    }

    async fn add_input(&self, input: DownloadInput) -> DownloadId {
        self.catalog.db.save_download(&input).await.unwrap()
    }

    async fn add_draft(&self, title: &str) -> DownloadId {
        self.add_input(DownloadInput {
            title: title.to_string(),
            file_source: FileSource::Direct,
            direct_url: "https://files.example.com/draft.pdf".to_string(),
            status: DownloadStatus::Draft,
            ..Default::default()
        })
        .await
    }
}

async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

async fn test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.persistence.database_path = dir.path().join("catalog.db");
    configure(&mut config);

    let catalog = Arc::new(Catalog::new(config).await.unwrap());
    TestApp { _dir: dir, catalog }
}

/// Response status, headers and body text
struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl TestResponse {
    fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }

    fn cookies(&self) -> Vec<String> {
        self.headers
            .get_all("set-cookie")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }
}

async fn send(app: Router, request: Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        body: String::from_utf8(body.to_vec()).unwrap(),
    }
}

async fn get(app: Router, uri: &str) -> TestResponse {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let app = test_app_with(|config| {
        // Port 0 = OS assigns a free port
        config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    })
    .await;

    let api_handle = app.catalog.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!api_handle.is_finished(), "server should still be running");
    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let app = test_app().await;

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(app.router(), request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(
        response.headers.contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let app = test_app_with(|config| config.server.api.cors_enabled = false).await;

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(app.router(), request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.headers.contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let app = test_app_with(|config| {
        config.server.api.cors_origins = vec!["https://site.example.com".to_string()];
    })
    .await;

    let allowed = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "https://site.example.com")
        .body(Body::empty())
        .unwrap();
    let response = send(app.router(), allowed).await;
    assert_eq!(
        response.headers.get("access-control-allow-origin").unwrap(),
        "https://site.example.com"
    );

    let other = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = send(app.router(), other).await;
    assert!(!response.headers.contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = test_app().await;
    let response = get(app.router(), "/nope").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
