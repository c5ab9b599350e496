//! Key/value records with per-key expiry.
//!
//! Job and result records live here under a TTL. The bundled store is in
//! memory; a networked store can plug in behind the [`TtlStore`] trait.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::Result;

/// Key/value store with per-key time-to-live.
#[async_trait]
pub trait TtlStore: Send + Sync {
    /// Store a value under a key, arming (or re-arming) its TTL.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Fetch a live value. Absent and expired keys both return `None`.
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

#[derive(Debug)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

/// In-memory [`TtlStore`] backed by a concurrent map.
///
/// Expired entries are dropped lazily on read and in bulk by
/// [`MemoryTtlStore::purge_expired`], which the service runs on a timer.
#[derive(Clone, Default)]
pub struct MemoryTtlStore {
    entries: Arc<DashMap<String, StoredValue>>,
}

impl MemoryTtlStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Drop all expired entries.
    ///
    /// # Returns
    /// The number of entries that were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, stored| {
            if stored.expires_at <= now {
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            debug!(removed, "purged expired records");
        }
        removed
    }

    /// Number of live and not-yet-purged entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TtlStore for MemoryTtlStore {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        // The read guard must be dropped before remove() touches the same
        // shard, so the expired case falls through the match.
        match self.entries.get(key) {
            None => return Ok(None),
            Some(stored) if stored.expires_at > Instant::now() => {
                return Ok(Some(stored.value.clone()));
            }
            Some(_) => {}
        }

        self.entries.remove(key);
        Ok(None)
    }
}

/// Start a background task that periodically purges expired entries.
///
/// # Returns
/// A join handle for the background task.
pub fn start_purge_task(
    store: MemoryTtlStore,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            timer.tick().await;
            store.purge_expired();
        }
    })
}
