//! Catalog server demo
//!
//! Runs the downloads catalog with its REST API, the HTML catalog pages and
//! the tracked delivery endpoint.
//!
//! ```bash
//! cargo run --example serve                    # default config
//! cargo run --example serve -- catalog.json    # config from a JSON file
//! RUST_LOG=downloads_catalog=debug cargo run --example serve
//! ```
//!
//! After starting, you can:
//! - Browse the catalog at http://localhost:6789/catalog
//! - View Swagger UI at http://localhost:6789/swagger-ui
//! - Query listings via GET http://localhost:6789/api/v1/downloads
//! - Follow tracked links at http://localhost:6789/download/{id}

use downloads_catalog::{Catalog, Config, DownloadInput, FileSource, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("downloads_catalog=info,tower_http=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_json_file(std::path::Path::new(&path)).await?,
        None => Config::default(),
    };
    let bind = config.server.api.bind_address;

    let catalog = Arc::new(Catalog::new(config).await?);

    // Seed one record so the listing is not empty on first run
    let (_, existing) = catalog.query(&Default::default(), None).await?;
    if existing.total == 0 {
        let sample = DownloadInput {
            title: "Getting Started Guide".to_string(),
            description: "<p>Everything you need for a first install.</p>".to_string(),
            file_source: FileSource::Direct,
            direct_url: "https://www.rust-lang.org/static/pdfs/Rust-Tiobe-Top-20.pdf".to_string(),
            categories: "guides, pdf".to_string(),
            tags: "beginner".to_string(),
            ..Default::default()
        };
        sample.validate()?;
        let id = catalog.db.save_download(&sample).await?;
        println!("Seeded sample download #{}", id);
    }

    println!("Starting downloads-catalog on http://{}", bind);
    println!("  Catalog:    http://{}/catalog", bind);
    println!("  Swagger UI: http://{}/swagger-ui", bind);
    println!("  API base:   http://{}/api/v1", bind);
    println!();
    println!("Example commands:");
    println!("  # Filtered listing");
    println!("  curl 'http://{}/api/v1/downloads?category=guides&sort=popular'", bind);
    println!();
    println!("  # Add a download");
    println!("  curl -X POST http://{}/api/v1/admin/downloads \\", bind);
    println!("    -H 'Content-Type: application/json' \\");
    println!(
        "    -d '{{\"title\": \"Manual\", \"file_source\": \"direct\", \"direct_url\": \"https://example.com/manual.pdf\"}}'"
    );

    let _server = catalog.spawn_api_server();
    run_with_shutdown(catalog).await?;

    Ok(())
}
