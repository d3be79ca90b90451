//! TTL cache in front of an [`EmbedFetcher`].
//!
//! Each key owns its own slot behind an async mutex. Concurrent misses for
//! one key queue on that slot, so the fetcher runs once and later callers
//! see the stored asset. The outer map lock is only held long enough to
//! find or create a slot, never across a fetch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use embedkit_core::{build_asset, EmbeddedAsset};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::client::EmbedFetcher;
use crate::error::FetchError;

const KEY_PREFIX: &str = "embeddedasset:";

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CacheEntry {
    asset: Arc<EmbeddedAsset>,
    expires_at: DateTime<Utc>,
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

pub struct CacheFront {
    fetcher: Arc<dyn EmbedFetcher>,
    ttl: TimeDelta,
    min_image_size: u32,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<String, Slot>>,
}

/// Cache key for a URL: a fixed prefix plus the SHA-256 of the trimmed URL.
#[must_use]
pub fn cache_key(url: &str) -> String {
    let digest = Sha256::digest(url.trim().as_bytes());
    format!("{KEY_PREFIX}{digest:x}")
}

impl CacheFront {
    #[must_use]
    pub fn new(fetcher: Arc<dyn EmbedFetcher>, ttl_secs: u64, min_image_size: u32) -> Self {
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self {
            fetcher,
            ttl,
            min_image_size,
            clock: Arc::new(SystemClock),
            slots: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the live cached asset for `url`, or fetches, builds and caches
    /// a new one.
    ///
    /// # Errors
    ///
    /// Propagates fetcher errors, and returns [`FetchError::InvalidAsset`]
    /// when the provider data does not build into an asset. Failures are
    /// never cached.
    pub async fn get_or_fetch(&self, url: &str) -> Result<Arc<EmbeddedAsset>, FetchError> {
        let url = url.trim();
        let key = cache_key(url);
        let slot = self.slot(&key).await;
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.expires_at > self.clock.now() {
                tracing::debug!(url, key = %key, "embed cache hit");
                return Ok(Arc::clone(&cached.asset));
            }
        }

        tracing::info!(url, key = %key, "embed cache miss, fetching");
        let data = self.fetcher.fetch(url).await?;
        let asset = build_asset(data.into_fields(self.min_image_size)).map_err(|source| {
            FetchError::InvalidAsset {
                url: url.to_string(),
                source,
            }
        })?;
        let asset = Arc::new(asset);

        let now = self.clock.now();
        *entry = Some(CacheEntry {
            asset: Arc::clone(&asset),
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        });

        Ok(asset)
    }

    /// Drops any cached asset for `url`.
    pub async fn invalidate(&self, url: &str) {
        let key = cache_key(url);
        if self.slots.lock().await.remove(&key).is_some() {
            tracing::debug!(url, key = %key, "embed cache entry invalidated");
        }
    }

    /// Removes expired and empty slots. Slots with a fetch in flight are
    /// skipped. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut slots = self.slots.lock().await;
        let before = slots.len();
        slots.retain(|_, slot| match slot.try_lock() {
            Ok(entry) => entry.as_ref().is_some_and(|e| e.expires_at > now),
            Err(_) => true,
        });
        let removed = before - slots.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = slots.len(), "purged embed cache");
        }
        removed
    }

    async fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(key.to_string()).or_default())
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
