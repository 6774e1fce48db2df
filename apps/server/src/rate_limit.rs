//! Per-IP sliding-window rate limit for booking creation.
//!
//! Admission already rejects double bookings, but a misbehaving client can
//! still burn through slots; the booking route therefore gets a strict
//! per-IP budget. Everything is in-memory — state resets on restart, which
//! is acceptable for this budget size.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::ApiResponse;

#[derive(Clone)]
pub struct BookingRateLimit {
    max_requests: u32,
    window: Duration,
    hits: Arc<DashMap<IpAddr, Vec<Instant>>>,
}

impl BookingRateLimit {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Arc::new(DashMap::new()),
        }
    }

    /// Returns `Ok(())` if allowed, `Err(retry_after_secs)` if rate limited.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let now = Instant::now();
        let window_start = now - self.window;

        let mut timestamps = self.hits.entry(ip).or_default();
        timestamps.retain(|t| *t > window_start);

        if timestamps.len() >= self.max_requests as usize {
            let oldest = timestamps[0];
            let retry_after = (oldest + self.window)
                .saturating_duration_since(now)
                .as_secs()
                .max(1);
            return Err(retry_after);
        }

        timestamps.push(now);
        Ok(())
    }

    /// Drop entries idle for more than 2× the window. Called from a
    /// background task.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let cutoff = self.window * 2;
        self.hits.retain(|_ip, timestamps| {
            timestamps.retain(|t| now.duration_since(*t) < cutoff);
            !timestamps.is_empty()
        });
    }
}

/// Axum middleware guarding `POST /api/bookings`.
pub async fn rate_limit_booking(
    State(limiter): State<BookingRateLimit>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_client_ip(&req);
    limiter.check(ip).map_err(too_many_requests)?;
    Ok(next.run(req).await)
}

/// Client IP from X-Forwarded-For (reverse proxy) or ConnectInfo.
fn extract_client_ip(req: &Request) -> IpAddr {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first_ip) = forwarded.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return ip;
            }
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .unwrap_or_else(|| IpAddr::from([127, 0, 0, 1]))
}

fn too_many_requests(retry_after: u64) -> Response {
    let body = ApiResponse::<()>::error(format!(
        "Too many requests. Try again in {} seconds",
        retry_after
    ));
    (
        StatusCode::TOO_MANY_REQUESTS,
        [("Retry-After", retry_after.to_string())],
        Json(body),
    )
        .into_response()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::thread::sleep;

    fn test_ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn allows_requests_under_limit() {
        let limiter = BookingRateLimit::new(3, Duration::from_secs(60));
        let ip = test_ip(1);
        assert!(limiter.check(ip).is_ok());
        assert!(limiter.check(ip).is_ok());
        assert!(limiter.check(ip).is_ok());
    }

    #[test]
    fn rejects_over_limit_with_retry_after() {
        let limiter = BookingRateLimit::new(1, Duration::from_secs(60));
        let ip = test_ip(1);
        limiter.check(ip).unwrap();
        let retry_after = limiter.check(ip).unwrap_err();
        assert!((1..=60).contains(&retry_after));
    }

    #[test]
    fn different_ips_independent() {
        let limiter = BookingRateLimit::new(1, Duration::from_secs(60));
        assert!(limiter.check(test_ip(1)).is_ok());
        assert!(limiter.check(test_ip(1)).is_err());
        assert!(limiter.check(test_ip(2)).is_ok());
    }

    #[test]
    fn window_expiry_allows_again() {
        let limiter = BookingRateLimit::new(1, Duration::from_millis(100));
        let ip = test_ip(1);
        assert!(limiter.check(ip).is_ok());
        assert!(limiter.check(ip).is_err());

        sleep(Duration::from_millis(150));

        assert!(limiter.check(ip).is_ok());
    }

    #[test]
    fn cleanup_removes_stale_entries() {
        let limiter = BookingRateLimit::new(10, Duration::from_millis(50));
        let ip = test_ip(1);
        limiter.check(ip).unwrap();

        sleep(Duration::from_millis(120)); // > 2× window

        limiter.cleanup();
        assert!(limiter.hits.get(&ip).is_none());
    }

    #[test]
    fn cleanup_preserves_active_entries() {
        let limiter = BookingRateLimit::new(2, Duration::from_secs(60));
        let ip = test_ip(1);
        limiter.check(ip).unwrap();

        limiter.cleanup();

        limiter.check(ip).unwrap();
        assert!(limiter.check(ip).is_err());
    }
}
