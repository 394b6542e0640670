use crate::db::Database;
use crate::types::{DownloadId, DownloadInput, FileSource};
use tempfile::NamedTempFile;

mod media;
mod terms;

/// Open a fresh database in a temp file; keep the file alive for the test
async fn open_db() -> (NamedTempFile, Database) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (temp_file, db)
}

/// Published direct-URL download with the given membership strings
fn direct_input(title: &str, categories: &str, tags: &str) -> DownloadInput {
    DownloadInput {
        title: title.to_string(),
        file_source: FileSource::Direct,
        direct_url: format!("https://files.example.com/{}.pdf", title.to_lowercase()),
        categories: categories.to_string(),
        tags: tags.to_string(),
        ..Default::default()
    }
}

async fn insert(db: &Database, title: &str, categories: &str, tags: &str) -> DownloadId {
    db.save_download(&direct_input(title, categories, tags))
        .await
        .unwrap()
}

/// Force a creation timestamp so sort order does not depend on insert timing
async fn set_created_at(db: &Database, id: DownloadId, created_at: i64) {
    sqlx::query("UPDATE downloads SET created_at = ? WHERE id = ?")
        .bind(created_at)
        .bind(id)
        .execute(db.pool())
        .await
        .unwrap();
}

async fn set_download_count(db: &Database, id: DownloadId, count: i64) {
    sqlx::query("UPDATE downloads SET download_count = ? WHERE id = ?")
        .bind(count)
        .bind(id)
        .execute(db.pool())
        .await
        .unwrap();
}
