use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{get_option, set_option, OptionStore};

const SUMMARIES_KEY: &str = "changelog_summaries";

/// A cached summary is served without re-fetching for this long.
pub const FRESHNESS_WINDOW: Duration = Duration::hours(24);
/// Entries older than this are dropped by `prune`.
pub const RETENTION_WINDOW: Duration = Duration::days(7);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub summary: String,
    /// Unix seconds.
    pub created_at: i64,
}

type Summaries = BTreeMap<String, CacheEntry>;

/// Last successful summary per source URL, kept as one map in the option store.
pub struct SummaryCache {
    store: Arc<dyn OptionStore>,
    // Serializes read-modify-write of the map.
    write_lock: Mutex<()>,
}

impl SummaryCache {
    pub fn new(store: Arc<dyn OptionStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Summaries> {
        Ok(get_option(self.store.as_ref(), SUMMARIES_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Like `load`, but an undecodable map is reported and replaced by an empty
    /// one. The flag says whether the stored value must be rewritten.
    async fn load_for_write(&self) -> Result<(Summaries, bool)> {
        let Some(bytes) = self.store.get_raw(SUMMARIES_KEY).await? else {
            return Ok((Summaries::new(), false));
        };
        match serde_json::from_slice(&bytes) {
            Ok(summaries) => Ok((summaries, false)),
            Err(e) => {
                warn!(error = %e, "stored summary cache is unreadable, starting it over");
                Ok((Summaries::new(), true))
            }
        }
    }

    pub async fn get(&self, url: &str) -> Result<Option<CacheEntry>> {
        self.get_at(url, Utc::now()).await
    }

    pub async fn get_at(&self, url: &str, now: DateTime<Utc>) -> Result<Option<CacheEntry>> {
        let summaries = self.load().await?;
        Ok(summaries
            .get(url)
            .filter(|entry| now.timestamp() - entry.created_at < FRESHNESS_WINDOW.num_seconds())
            .cloned())
    }

    pub async fn put(&self, url: &str, summary: &str) -> Result<()> {
        self.put_at(url, summary, Utc::now()).await
    }

    pub async fn put_at(&self, url: &str, summary: &str, now: DateTime<Utc>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let (mut summaries, _) = self.load_for_write().await?;
        summaries.insert(
            url.to_string(),
            CacheEntry {
                summary: summary.to_string(),
                created_at: now.timestamp(),
            },
        );
        set_option(self.store.as_ref(), SUMMARIES_KEY, &summaries).await?;
        debug!(url, "summary cached");
        Ok(())
    }

    /// Drop every entry strictly older than `retention`. Returns how many went.
    pub async fn prune(&self, retention: Duration) -> Result<usize> {
        self.prune_at(retention, Utc::now()).await
    }

    pub async fn prune_at(&self, retention: Duration, now: DateTime<Utc>) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let (mut summaries, reset) = self.load_for_write().await?;
        let before = summaries.len();
        summaries.retain(|_, entry| now.timestamp() - entry.created_at <= retention.num_seconds());
        let removed = before - summaries.len();
        if removed > 0 || reset {
            set_option(self.store.as_ref(), SUMMARIES_KEY, &summaries).await?;
            debug!(removed, "stale summaries pruned");
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.delete(SUMMARIES_KEY).await
    }
}
