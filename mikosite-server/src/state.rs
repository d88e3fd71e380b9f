use std::sync::Arc;

use serde_json::Value;

use crate::{
    auth,
    cache::{self, Cache},
    clock::Clock,
    store::Store,
    throttle::{self, Throttle},
};

pub struct AppState {
    pub store: Store,
    pub cache: Cache<&'static str, Value>,
    pub clock: Arc<dyn Clock>,
    pub throttle: Throttle,
    admin_tokens: Vec<String>,
}

impl AppState {
    pub fn new(
        store: Store,
        cache_config: cache::Config,
        throttle_config: throttle::Config,
        clock: Arc<dyn Clock>,
        admin_tokens: Vec<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            cache: Cache::new(cache_config, clock.clone()),
            throttle: Throttle::new(throttle_config, clock.clone()),
            clock,
            admin_tokens,
        })
    }

    pub fn is_admin_token(&self, token: &str) -> bool {
        auth::matches_any(token, &self.admin_tokens)
    }

    pub fn invalidate(&self, keys: &[&'static str]) {
        for key in keys {
            self.cache.remove(key);
        }
    }
}
