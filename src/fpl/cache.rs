//! Single-slot TTL cache for the fantasy bootstrap document.
//!
//! All three leaderboards are projections of the same upstream document, so
//! one slot serves them all: a fresh entry stored while resolving `scorers`
//! also satisfies `assists` and `cleansheets` until it expires.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::models::Bootstrap;

/// Time source, swappable so TTL boundaries can be tested deterministically.
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

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Arc<Bootstrap>,
    pub source_url: String,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Clone)]
pub struct StatsCache {
    slot: Arc<RwLock<Option<CacheEntry>>>,
    clock: Arc<dyn Clock>,
}

impl StatsCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        StatsCache {
            slot: Arc::new(RwLock::new(None)),
            clock,
        }
    }

    /// The stored entry, fresh or not.
    pub async fn get(&self) -> Option<CacheEntry> {
        self.slot.read().await.clone()
    }

    /// The stored entry only if it has not expired.
    pub async fn fresh(&self) -> Option<CacheEntry> {
        let now = self.clock.now();
        self.slot
            .read()
            .await
            .as_ref()
            .filter(|e| e.is_fresh_at(now))
            .cloned()
    }

    pub async fn is_fresh(&self) -> bool {
        self.fresh().await.is_some()
    }

    /// Overwrite the slot. Concurrent writers race; the last one wins.
    pub async fn put(&self, payload: Arc<Bootstrap>, source_url: &str, ttl: Duration) {
        let now = self.clock.now();
        let entry = CacheEntry {
            payload,
            source_url: source_url.to_string(),
            stored_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        debug!("Stats cache stored from {} until {}", entry.source_url, entry.expires_at);
        *self.slot.write().await = Some(entry);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Clock that only moves when told to.
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new() -> Arc<Self> {
            let start = DateTime::parse_from_rfc3339("2025-01-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc);
            Arc::new(ManualClock {
                now: Mutex::new(start),
            })
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}
