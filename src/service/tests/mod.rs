use super::*;
use crate::types::{DownloadInput, DownloadStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use tempfile::NamedTempFile;

mod delivery;

/// Resolver over a fixed map, for tests that need media URLs without the media table
struct StaticAssets(HashMap<i64, String>);

#[async_trait]
impl AssetResolver for StaticAssets {
    async fn attachment_url(&self, file_id: i64) -> Result<Option<String>> {
        Ok(self.0.get(&file_id).cloned())
    }

    async fn image_url(&self, image_id: i64, size: &str) -> Result<Option<String>> {
        Ok(self
            .0
            .get(&image_id)
            .map(|url| format!("{}?size={}", url, size)))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

struct Fixture {
    _temp_file: NamedTempFile,
    db: Arc<Database>,
    service: DownloadService,
}

async fn fixture_with(config: Config) -> Fixture {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Arc::new(Database::new(temp_file.path()).await.unwrap());
    let assets = StaticAssets(HashMap::from([
        (10, "https://cdn.example.com/manual.pdf".to_string()),
        (20, "https://cdn.example.com/cover.png".to_string()),
    ]));
    let service = DownloadService::new(db.clone(), Arc::new(assets), &config);

    Fixture {
        _temp_file: temp_file,
        db,
        service,
    }
}

async fn fixture() -> Fixture {
    fixture_with(Config::default()).await
}

fn direct(title: &str) -> DownloadInput {
    DownloadInput {
        title: title.to_string(),
        file_source: FileSource::Direct,
        direct_url: "https://x.example/y.pdf".to_string(),
        ..Default::default()
    }
}

fn media(title: &str, file_id: i64) -> DownloadInput {
    DownloadInput {
        title: title.to_string(),
        file_source: FileSource::Media,
        file_id,
        ..Default::default()
    }
}

fn client(ip: &str) -> ClientContext {
    ClientContext::new(ip.parse::<IpAddr>().unwrap())
}
