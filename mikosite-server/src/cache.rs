use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};

use crate::clock::Clock;

pub const UPCOMING_SEMINARS: &str = "upcoming-seminars-display-data";
pub const UPCOMING_SEMINARS_MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub const HOMEPAGE_POSTS: &str = "mainsite-posts-display-data";
pub const HOMEPAGE_POSTS_MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub const SEMINAR_GROUPS: &str = "seminar-groups-display-data";
pub const SEMINAR_GROUPS_MAX_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub struct Config {
    pub enabled: bool,
    pub capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 64,
        }
    }
}

/// Key/TTL wrapper over a concurrent cache; every entry carries its own
/// expiry, measured on the shared [`Clock`], and is never handed out after it.
pub struct Cache<K, V> {
    enabled: bool,
    clock: Arc<dyn Clock>,
    inner: quick_cache::sync::Cache<K, (NaiveDateTime, Arc<V>)>,
}

impl<K, V> Cache<K, V>
where
    K: Clone + Eq + Hash,
{
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            enabled: config.enabled,
            clock,
            inner: quick_cache::sync::Cache::new(config.capacity.max(1)),
        }
    }

    pub fn insert(&self, key: K, value: V, ttl: Duration) -> Arc<V> {
        let arcd = Arc::new(value);
        if !self.enabled || ttl.is_zero() {
            return arcd;
        }

        let expires = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| self.clock.now().checked_add_signed(ttl));
        let Some(expires) = expires else {
            return arcd;
        };

        self.inner.insert(key, (expires, Arc::clone(&arcd)));
        arcd
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        if !self.enabled {
            return None;
        }

        let (expires, value) = self.inner.get(key)?;
        if self.clock.now() >= expires {
            self.inner.remove(key);
            return None;
        }

        Some(value)
    }

    pub fn remove(&self, key: &K) {
        self.inner.remove(key);
    }
}
