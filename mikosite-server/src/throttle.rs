//! Per-client request limits for callers without an admin token.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{auth, clock::Clock, error::AppError, state::AppState};

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

pub struct Config {
    /// Requests allowed per client and window; zero turns throttling off.
    pub requests: u32,
    pub window: Duration,
    pub capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            requests: 120,
            window: Duration::from_secs(60),
            capacity: 4096,
        }
    }
}

/// Fixed-window counters keyed by client and window number. Windows are
/// measured on the shared [`Clock`]; stale ones age out of the cache.
pub struct Throttle {
    requests: u32,
    window: i64,
    clock: Arc<dyn Clock>,
    counters: quick_cache::sync::Cache<(String, i64), Arc<AtomicU32>>,
}

impl Throttle {
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            requests: config.requests,
            window: i64::try_from(config.window.as_secs()).unwrap_or(i64::MAX).max(1),
            clock,
            counters: quick_cache::sync::Cache::new(config.capacity.max(1)),
        }
    }

    /// Counts one request from `client`. Returns the seconds until the next
    /// window when the allowance is used up.
    pub fn admit(&self, client: &str) -> Result<(), u64> {
        if self.requests == 0 {
            return Ok(());
        }

        let now = self.clock.now().and_utc().timestamp();
        let window = now.div_euclid(self.window);
        let counter = self
            .counters
            .get_or_insert_with(&(client.to_string(), window), || {
                Ok::<_, Infallible>(Arc::new(AtomicU32::new(0)))
            })
            .unwrap_or_else(|never| match never {});

        if counter.fetch_add(1, Ordering::Relaxed) < self.requests {
            Ok(())
        } else {
            let wait = self.window - now.rem_euclid(self.window);
            Err(u64::try_from(wait).unwrap_or(0))
        }
    }
}

/// First forwarded hop, then the peer address.
fn client_key(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());

    if let Some(hop) = forwarded {
        return hop.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn carries_admin_token(state: &AppState, headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(auth::presented_token)
        .is_some_and(|token| state.is_admin_token(token))
}

pub async fn limit(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    if carries_admin_token(&state, request.headers()) {
        return next.run(request).await;
    }

    let client = client_key(&request);
    match state.throttle.admit(&client) {
        Ok(()) => next.run(request).await,
        Err(wait) => {
            warn!(%client, wait, "request throttled");
            AppError::Throttled(wait).into_response()
        }
    }
}
