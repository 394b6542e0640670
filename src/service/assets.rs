//! Asset collaborator: turns attachment and image ids into public URLs

use crate::Result;
use crate::db::Database;
use async_trait::async_trait;
use std::sync::Arc;

/// Resolves asset ids referenced by download records
///
/// `file_id` and `featured_image_id` are opaque integers owned by whatever
/// stores the files. Implementations return `None` for ids they do not know,
/// which callers treat as "unavailable" rather than as an error.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// Public URL of a downloadable attachment
    async fn attachment_url(&self, file_id: i64) -> Result<Option<String>>;

    /// Display URL of an image at the given size key (e.g. "medium")
    async fn image_url(&self, image_id: i64, size: &str) -> Result<Option<String>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Resolver backed by the `media` table
///
/// Stores a single rendition per image, so the size key is not used.
pub struct MediaLibrary {
    db: Arc<Database>,
}

impl MediaLibrary {
    /// Create a resolver over the catalog database
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AssetResolver for MediaLibrary {
    async fn attachment_url(&self, file_id: i64) -> Result<Option<String>> {
        if file_id <= 0 {
            return Ok(None);
        }
        self.db.media_url(file_id).await
    }

    async fn image_url(&self, image_id: i64, _size: &str) -> Result<Option<String>> {
        if image_id <= 0 {
            return Ok(None);
        }
        self.db.media_image_url(image_id).await
    }

    fn name(&self) -> &'static str {
        "media-library"
    }
}

/// Resolver for catalogs that only use direct URLs
///
/// Every media-sourced download resolves to nothing and is therefore
/// undeliverable.
pub struct NoAssets;

#[async_trait]
impl AssetResolver for NoAssets {
    async fn attachment_url(&self, _file_id: i64) -> Result<Option<String>> {
        Ok(None)
    }

    async fn image_url(&self, _image_id: i64, _size: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
