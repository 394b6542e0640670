//! End-to-end scenarios through the public catalog API
//!
//! Each test opens a fresh catalog on a temporary database and drives it the
//! way an embedding application would: records are saved through the store,
//! listings go through `Catalog::query`, downloads through the service.

use downloads_catalog::{
    Catalog, ClientContext, Config, DownloadInput, FileSource, QueryInput, TermColumn,
};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tempfile::TempDir;

async fn open_catalog() -> (Arc<Catalog>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.persistence.database_path = dir.path().join("scenarios.db");
    let catalog = Catalog::new(config).await.unwrap();
    (Arc::new(catalog), dir)
}

fn direct(title: &str, categories: &str) -> DownloadInput {
    DownloadInput {
        title: title.to_string(),
        file_source: FileSource::Direct,
        direct_url: "https://x.example.com/y.pdf".to_string(),
        categories: categories.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_then_find_direct_record() {
    let (catalog, _dir) = open_catalog().await;
    let mut input = direct("Guide", "pdf,guide");
    input.file_id = 42;

    input.validate().unwrap();
    let id = catalog.db.save_download(&input).await.unwrap();
    assert!(id.get() > 0);

    let record = catalog.db.find_download(id).await.unwrap().unwrap();
    assert_eq!(record.title, "Guide");
    assert_eq!(record.file_source, FileSource::Direct);
    // A direct record never keeps a media attachment
    assert_eq!(record.file_id, 0);
    assert_eq!(record.categories.to_csv(), "pdf,guide");
}

#[tokio::test]
async fn category_filter_returns_only_members() {
    let (catalog, _dir) = open_catalog().await;
    catalog.db.save_download(&direct("First", "pdf,guide")).await.unwrap();
    catalog.db.save_download(&direct("Second", "guide")).await.unwrap();
    catalog.db.save_download(&direct("Third", "guidelines")).await.unwrap();

    let input = QueryInput {
        category: Some("guide".to_string()),
        ..Default::default()
    };
    let (state, page) = catalog.query(&input, None).await.unwrap();

    assert_eq!(state.category, "guide");
    assert_eq!(page.total, 2);
    let mut titles: Vec<_> = page.items.iter().map(|r| r.title.as_str()).collect();
    titles.sort();
    assert_eq!(titles, vec!["First", "Second"]);
}

#[tokio::test]
async fn rapid_repeat_downloads_count_once() {
    let (catalog, _dir) = open_catalog().await;
    let id = catalog.db.save_download(&direct("Guide", "")).await.unwrap();
    let ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));

    let mut counted = 0;
    for _ in 0..3 {
        // Fresh context each time: no marker, only the side store remembers
        let mut client = ClientContext::new(ip);
        if catalog.service.track_download(id, &mut client).await.unwrap() {
            counted += 1;
        }
    }

    assert_eq!(counted, 1);
    assert_eq!(catalog.db.get_download_count(id).await.unwrap(), 1);
}

#[tokio::test]
async fn registered_term_appears_with_zero_count() {
    let (catalog, _dir) = open_catalog().await;

    assert!(
        catalog
            .db
            .register_term(TermColumn::Categories, "new-cat")
            .await
            .unwrap()
    );
    let terms = catalog
        .db
        .aggregate_terms(TermColumn::Categories, None)
        .await
        .unwrap();

    assert_eq!(terms.len(), 1);
    assert_eq!(terms[0].slug, "new-cat");
    assert_eq!(terms[0].count, 0);
}

#[tokio::test]
async fn title_desc_second_page() {
    let (catalog, _dir) = open_catalog().await;
    for title in ["Alpha", "Bravo", "Charlie", "Delta", "Echo"] {
        catalog.db.save_download(&direct(title, "")).await.unwrap();
    }

    let input = QueryInput {
        sort: Some("title_desc".to_string()),
        per_page: Some(2),
        page: Some(2),
        ..Default::default()
    };
    let (_, page) = catalog.query(&input, None).await.unwrap();

    let titles: Vec<_> = page.items.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Charlie", "Bravo"]);
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 3);
}
