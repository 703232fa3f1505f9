use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::ApiConfig;
use crate::error::{ApiError, AppError};

const LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again in an hour.";
const LIMITED_PREFIX: &str = "/api";

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of counting one request against its client's window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Fixed-window request counter keyed by client address
#[derive(Debug)]
pub struct RateLimiter {
    max: u32,
    window: Duration,
    clients: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self { max, window, clients: Mutex::new(HashMap::new()) }
    }

    pub fn from_config(api: &ApiConfig) -> Arc<Self> {
        Arc::new(Self::new(api.rate_limit_max, Duration::from_secs(api.rate_limit_window_secs)))
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn check(&self, client: &str) -> Decision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> Decision {
        let mut clients = match self.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Drop expired windows so the map only holds active clients
        if clients.len() > 10_000 {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients
            .entry(client.to_string())
            .or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, count: 0 };
        }

        if entry.count >= self.max {
            let elapsed = now.duration_since(entry.started);
            return Decision::Limited { retry_after: self.window.saturating_sub(elapsed) };
        }
        entry.count += 1;
        Decision::Allowed { remaining: self.max - entry.count }
    }
}

/// Socket address first; forwarded headers only when the connection info is absent
fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    forwarded_ip(request.headers())
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let first_forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());
    first_forwarded.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|ip| ip.trim().parse().ok())
    })
}

/// Count every `/api` request per client; over the limit answers 429 with `Retry-After`
pub async fn rate_limit(State(limiter): State<Arc<RateLimiter>>, request: Request, next: Next) -> Response {
    if limiter.max() == 0 || !request.uri().path().starts_with(LIMITED_PREFIX) {
        return next.run(request).await;
    }

    let client = client_key(&request);
    match limiter.check(&client) {
        Decision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(HeaderName::from_static("x-ratelimit-limit"), HeaderValue::from(limiter.max()));
            headers.insert(HeaderName::from_static("x-ratelimit-remaining"), HeaderValue::from(remaining));
            response
        }
        Decision::Limited { retry_after } => {
            tracing::warn!("Rate limit exceeded for {}", client);
            let mut response = AppError::from(ApiError::too_many_requests(LIMIT_MESSAGE)).into_response();
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after.as_secs().max(1)));
            headers.insert(HeaderName::from_static("x-ratelimit-limit"), HeaderValue::from(limiter.max()));
            headers.insert(HeaderName::from_static("x-ratelimit-remaining"), HeaderValue::from(0u32));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_after_max_requests_in_a_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(3600));
        let now = Instant::now();

        assert_eq!(limiter.check_at("10.0.0.1", now), Decision::Allowed { remaining: 1 });
        assert_eq!(limiter.check_at("10.0.0.1", now), Decision::Allowed { remaining: 0 });
        assert!(matches!(limiter.check_at("10.0.0.1", now), Decision::Limited { .. }));

        // Other clients have their own window
        assert_eq!(limiter.check_at("10.0.0.2", now), Decision::Allowed { remaining: 1 });
    }

    #[test]
    fn window_resets_after_it_elapses() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(matches!(limiter.check_at("a", now), Decision::Allowed { .. }));
        match limiter.check_at("a", now + Duration::from_secs(20)) {
            Decision::Limited { retry_after } => assert_eq!(retry_after, Duration::from_secs(40)),
            other => panic!("expected limit, got {:?}", other),
        }
        assert!(matches!(limiter.check_at("a", now + Duration::from_secs(60)), Decision::Allowed { .. }));
    }

    #[test]
    fn forwarded_headers_pick_the_first_valid_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(forwarded_ip(&headers), "203.0.113.7".parse().ok());

        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        assert_eq!(forwarded_ip(&headers), "198.51.100.4".parse().ok());

        assert_eq!(forwarded_ip(&HeaderMap::new()), None);
    }
}
