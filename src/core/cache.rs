use crate::core::clock::IClock;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CacheEntry<Res> {
    pub value: Res,
    pub timestamp: DateTime<Utc>,
}

impl<Res> CacheEntry<Res> {
    fn is_live(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.timestamp < ttl
    }
}

/// Per-handler response cache. Entries are never swept in the background:
/// a stale entry is only removed by the lookup that finds it.
pub struct ResultCache<Res> {
    entries: DashMap<String, CacheEntry<Res>>,
    ttl: Duration,
    clock: Arc<dyn IClock>,
}

impl<Res> ResultCache<Res>
where
    Res: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration, clock: Arc<dyn IClock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn lookup(&self, key: &str) -> Option<Res> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now, self.ttl) {
                return Some(entry.value.clone());
            }
        }

        let _evicted = self
            .entries
            .remove_if(key, |_, entry| !entry.is_live(now, self.ttl));

        #[cfg(feature = "logging")]
        if _evicted.is_some() {
            log::debug!("Mediator. Evicted stale cache entry '{}'", key);
        }

        None
    }

    pub fn store(&self, key: String, value: Res) {
        let timestamp = self.clock.now();
        self.entries.insert(key, CacheEntry { value, timestamp });
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
