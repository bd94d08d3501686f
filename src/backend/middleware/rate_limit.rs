/**
 * Rate Limiting Middleware
 *
 * One token bucket per client IP. Buckets refill continuously at the
 * configured rate and hold at most `max(1, rate)` tokens, so a client may
 * burst up to one second's budget. A bucket idle for longer than the TTL is
 * forgotten; the next request from that client starts with a full bucket.
 *
 * # Client IP Lookup
 *
 * First match wins:
 * 1. First entry of `X-Forwarded-For`
 * 2. Peer address of the connection (`ConnectInfo`)
 * 3. `X-Real-IP`
 *
 * Requests with no usable address share the bucket for `0.0.0.0`.
 */

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::backend::error::ApiError;
use crate::backend::middleware::logging::request_id;
use crate::backend::server::config::ServerConfig;
use crate::backend::server::state::AppState;

const MIN_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_seen: Instant,
}

/// Per-client token buckets
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<DashMap<IpAddr, Bucket>>,
    rate: f64,
    burst: f64,
    ttl: Duration,
}

impl RateLimiter {
    /// Limiter allowing `rate` requests per second per client
    pub fn new(rate: f64, ttl: Duration) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            rate,
            burst: rate.max(1.0),
            ttl,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.rate_per_second, config.rate_ttl)
    }

    /// Take one token for `ip`; `false` when the budget is exhausted
    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    /// `check` against an explicit clock
    pub fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut entry = self.buckets.entry(ip).or_insert(Bucket {
            tokens: self.burst,
            last_seen: now,
        });
        let bucket = entry.value_mut();

        let idle = now.saturating_duration_since(bucket.last_seen);
        if idle >= self.ttl {
            bucket.tokens = self.burst;
        } else {
            bucket.tokens = (bucket.tokens + idle.as_secs_f64() * self.rate).min(self.burst);
        }
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets idle for longer than the TTL
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_seen) < self.ttl);
    }

    /// Number of tracked clients
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    /// Spawn a task that periodically drops expired buckets
    pub fn spawn_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.ttl.max(MIN_CLEANUP_INTERVAL));
            loop {
                interval.tick().await;
                limiter.cleanup_expired();
                tracing::debug!(clients = limiter.tracked_clients(), "Cleaned up expired rate limit buckets");
            }
        })
    }
}

/// Resolve the client address used as the bucket key
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    header_ip("x-forwarded-for")
        .or_else(|| peer.map(|addr| addr.ip()))
        .or_else(|| header_ip("x-real-ip"))
}

/// Rate limiting middleware
///
/// Over-budget requests are answered with 429 before any handler runs.
pub async fn rate_limit_middleware(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer).unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !app_state.limiter.check(ip) {
        tracing::error!(
            request_id = request_id(request.headers()),
            uri = %request.uri(),
            method = %request.method(),
            client = %ip,
            "request limit reached"
        );
        return Err(ApiError::RateLimited);
    }

    Ok(next.run(request).await)
}
