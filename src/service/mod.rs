//! Delivery and tracking
//!
//! [`DownloadService`] sits between the repository and the HTTP layer:
//! - resolves where a published download is actually served from
//! - counts downloads, suppressing repeats through a [`Throttle`]
//! - builds tracking URLs (through the delivery endpoint) and public payloads
//!
//! Absent and draft records are indistinguishable here: both resolve to
//! nothing and are never tracked.

mod assets;
mod client;
mod throttle;

pub use assets::{AssetResolver, MediaLibrary, NoAssets};
pub use client::{ClientContext, client_ip};
pub use throttle::{ClientMarker, SideStore, Throttle, ThrottleChannel};

use crate::Result;
use crate::config::{Config, DeliveryConfig};
use crate::db::Database;
use crate::terms::{TermSet, display_name};
use crate::text::{excerpt_or_summary, paragraphs};
use crate::types::{DownloadId, DownloadPayload, DownloadRecord, FileSource, TermRef};
use std::sync::Arc;
use std::time::Duration;

/// Words kept when deriving a payload excerpt from the description
const PAYLOAD_EXCERPT_WORDS: usize = 32;

/// Image size key used for payload thumbnails
const PAYLOAD_IMAGE_SIZE: &str = "medium";

/// Resolves, tracks and describes downloads
pub struct DownloadService {
    db: Arc<Database>,
    assets: Arc<dyn AssetResolver>,
    throttle: Throttle,
    delivery: DeliveryConfig,
}

impl DownloadService {
    /// Service with the standard throttle (client marker + side store)
    pub fn new(db: Arc<Database>, assets: Arc<dyn AssetResolver>, config: &Config) -> Self {
        let throttle = Throttle::standard(db.clone(), config.tracking.throttle_window);
        Self {
            db,
            assets,
            throttle,
            delivery: config.delivery.clone(),
        }
    }

    /// Replace the throttle
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Underlying repository
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Asset collaborator
    pub fn assets(&self) -> &Arc<dyn AssetResolver> {
        &self.assets
    }

    /// Suppression window of the throttle
    pub fn throttle_window(&self) -> Duration {
        self.throttle.window()
    }

    /// Record by id, only if published
    pub async fn find_published(&self, id: DownloadId) -> Result<Option<DownloadRecord>> {
        Ok(self
            .db
            .find_download(id)
            .await?
            .filter(DownloadRecord::is_published))
    }

    /// Where a published download is served from; `None` when absent, draft or unresolvable
    pub async fn resolve_destination(&self, id: DownloadId) -> Result<Option<String>> {
        match self.find_published(id).await? {
            Some(record) => self.resolve_record(&record).await,
            None => Ok(None),
        }
    }

    /// Destination of an already loaded record
    pub async fn resolve_record(&self, record: &DownloadRecord) -> Result<Option<String>> {
        if !record.is_published() {
            return Ok(None);
        }

        match record.file_source {
            FileSource::Direct => {
                let url = record.direct_url.trim();
                Ok((!url.is_empty()).then(|| url.to_string()))
            }
            FileSource::Media if record.file_id > 0 => {
                self.assets.attachment_url(record.file_id).await
            }
            FileSource::Media => Ok(None),
        }
    }

    /// Count a download unless the record is absent, draft, or the client is throttled
    ///
    /// Returns whether the counter was incremented.
    pub async fn track_download(&self, id: DownloadId, client: &mut ClientContext) -> Result<bool> {
        if self.find_published(id).await?.is_none() {
            return Ok(false);
        }

        if self.throttle.check_and_arm(id, client).await? {
            tracing::debug!(download_id = %id, ip = %client.ip(), "Download throttled");
            return Ok(false);
        }

        let tracked = self.db.increment_download_count(id).await?;
        if tracked {
            tracing::debug!(download_id = %id, "Download tracked");
        }
        Ok(tracked)
    }

    /// Tracking URL: `{public_url}/{route}/{id}`
    ///
    /// Links shown to users must go through this URL, never straight to the
    /// resolved destination, or tracking is bypassed.
    pub fn download_url(&self, id: DownloadId) -> String {
        format!(
            "{}/{}/{}",
            self.delivery.public_url.trim_end_matches('/'),
            self.delivery.route_segment(),
            id
        )
    }

    /// Full public representation of a record
    pub async fn payload(&self, record: &DownloadRecord) -> Result<DownloadPayload> {
        let featured_image = if record.featured_image_id > 0 {
            self.assets
                .image_url(record.featured_image_id, PAYLOAD_IMAGE_SIZE)
                .await?
                .unwrap_or_default()
        } else {
            String::new()
        };

        Ok(DownloadPayload {
            id: record.id,
            title: record.title.clone(),
            description: paragraphs(&record.description),
            excerpt: excerpt_or_summary(
                &record.excerpt,
                &record.description,
                PAYLOAD_EXCERPT_WORDS,
            ),
            download_url: self.download_url(record.id),
            download_count: record.download_count,
            source: record.file_source,
            file_id: record.file_id,
            direct_url: record.direct_url.clone(),
            featured_image,
            categories: term_refs(&record.categories),
            tags: term_refs(&record.tags),
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// `[{id, slug, name}]` with id = CRC-32 of the slug
fn term_refs(set: &TermSet) -> Vec<TermRef> {
    set.iter()
        .map(|slug| TermRef {
            id: crc32fast::hash(slug.as_bytes()),
            slug: slug.to_string(),
            name: display_name(slug),
        })
        .collect()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
