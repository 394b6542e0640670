//! Duplicate-download suppression
//!
//! Two independent "have we seen this client download this recently?"
//! channels are consulted:
//! - [`ClientMarker`]: a per-download marker cookie the client sends back
//! - [`SideStore`]: a server-side mark keyed by a hash of (download id, client IP)
//!
//! Either channel reporting a recent download throttles the call. Each
//! channel checks and arms in one step, so a channel that had not seen the
//! download is armed by the same call and both converge on the same window
//! no matter which one fired. The side store's step is a single upsert,
//! which keeps simultaneous requests from one client down to one count.

use super::client::ClientContext;
use crate::Result;
use crate::db::Database;
use crate::types::DownloadId;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// One suppression channel
#[async_trait]
pub trait ThrottleChannel: Send + Sync {
    /// Record a download of `id` by `client` for `window`, unless one is
    /// already recorded
    ///
    /// Returns true when the download was seen within the window, in which
    /// case nothing is re-armed.
    async fn check_and_arm(
        &self,
        id: DownloadId,
        client: &mut ClientContext,
        window: Duration,
    ) -> Result<bool>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Client-side marker channel
///
/// Best effort: a client that drops cookies is never throttled by it.
pub struct ClientMarker;

#[async_trait]
impl ThrottleChannel for ClientMarker {
    async fn check_and_arm(
        &self,
        id: DownloadId,
        client: &mut ClientContext,
        _window: Duration,
    ) -> Result<bool> {
        if client.has_marker(id) {
            return Ok(true);
        }
        // The cookie's max-age carries the window; the HTTP layer sets it
        client.arm_marker(id);
        Ok(false)
    }

    fn name(&self) -> &'static str {
        "client-marker"
    }
}

/// Server-side channel backed by the `throttle_marks` table
pub struct SideStore {
    db: Arc<Database>,
}

impl SideStore {
    /// Create a channel over the catalog database
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Mark key: SHA-256 of `"{id}|{ip}"`, hex encoded
    pub fn mark_key(id: DownloadId, client: &ClientContext) -> String {
        let digest = Sha256::digest(format!("{}|{}", id, client.ip()).as_bytes());
        let mut key = String::with_capacity(3 + digest.len() * 2);
        key.push_str("dl:");
        for byte in digest {
            key.push_str(&format!("{:02x}", byte));
        }
        key
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl ThrottleChannel for SideStore {
    async fn check_and_arm(
        &self,
        id: DownloadId,
        client: &mut ClientContext,
        window: Duration,
    ) -> Result<bool> {
        let now = now_ms();
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        let claimed = self
            .db
            .claim_throttle_mark(&Self::mark_key(id, client), now, now.saturating_add(window_ms))
            .await?;

        if claimed {
            // Expired marks are already reclaimable; purging only keeps the table small
            if let Err(e) = self.db.purge_expired_throttle_marks(now).await {
                tracing::warn!(error = %e, "Failed to purge expired throttle marks");
            }
        }

        Ok(!claimed)
    }

    fn name(&self) -> &'static str {
        "side-store"
    }
}

/// Channels combined by logical OR over a shared window
pub struct Throttle {
    channels: Vec<Box<dyn ThrottleChannel>>,
    window: Duration,
}

impl Throttle {
    /// Throttle with no channels (never throttles)
    pub fn new(window: Duration) -> Self {
        Self {
            channels: Vec::new(),
            window,
        }
    }

    /// Client marker plus server-side store
    pub fn standard(db: Arc<Database>, window: Duration) -> Self {
        Self::new(window)
            .with_channel(ClientMarker)
            .with_channel(SideStore::new(db))
    }

    /// Add a channel
    pub fn with_channel(mut self, channel: impl ThrottleChannel + 'static) -> Self {
        self.channels.push(Box::new(channel));
        self
    }

    /// Suppression window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run every channel; any that had not seen the download is armed
    ///
    /// Returns whether the call is throttled.
    pub async fn check_and_arm(&self, id: DownloadId, client: &mut ClientContext) -> Result<bool> {
        let mut throttled = false;

        for channel in &self.channels {
            if channel.check_and_arm(id, client, self.window).await? {
                tracing::debug!(download_id = %id, channel = channel.name(), "Download seen recently");
                throttled = true;
            }
        }

        Ok(throttled)
    }
}
