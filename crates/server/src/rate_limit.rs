use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use marquee_core::error::ApiError;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::AppError;

/// Sign-in, registration and verification attempts allowed per client
/// within one window.
pub const AUTH_ATTEMPTS_PER_WINDOW: u64 = 20;
pub const AUTH_WINDOW_SECS: u64 = 60;

/// Buckets are swept once the map grows past this many clients.
const SWEEP_THRESHOLD: usize = 1024;

/// Sliding-window request limiter keyed by client.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    max_requests: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u64, window_secs: u64) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Record a request for `key`. Returns the remaining allowance, or the
    /// number of seconds to wait when the window is full.
    pub async fn check(&self, key: &str) -> Result<u64, u64> {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let window = self.window;

        if buckets.len() > SWEEP_THRESHOLD {
            buckets.retain(|_, hits| hits.last().is_some_and(|t| now.duration_since(*t) < window));
        }

        let hits = buckets.entry(key.to_string()).or_default();
        hits.retain(|t| now.duration_since(*t) < window);

        if hits.len() as u64 >= self.max_requests {
            let retry_after = hits
                .first()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            Err(retry_after.as_secs().max(1))
        } else {
            hits.push(now);
            Ok(self.max_requests - hits.len() as u64)
        }
    }
}

/// Limits write requests per client address. Requests without connection
/// info (e.g. in-process test servers) share one bucket.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::GET {
        return next.run(request).await;
    }

    let Some(limiter) = request.extensions().get::<RateLimiter>().cloned() else {
        return next.run(request).await;
    };

    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| format!("ip:{}", ci.0.ip()))
        .unwrap_or_else(|| "unknown".to_string());

    match limiter.check(&key).await {
        Ok(_remaining) => next.run(request).await,
        Err(retry_after_seconds) => {
            warn!(client = %key, path = %request.uri().path(), "auth rate limit hit");
            AppError(ApiError::TooManyRequests {
                retry_after_seconds,
            })
            .into_response()
        }
    }
}
