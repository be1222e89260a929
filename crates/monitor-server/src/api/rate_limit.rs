//! In-memory rate limiter для входа операторов: N попыток в окне на IP.

use crate::error::AppError;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Window {
    count: u32,
    started: Instant,
}

/// Ограничитель запросов по ключу (IP клиента).
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<DashMap<String, Window>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            max_requests,
            window,
        }
    }

    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();

        if self.windows.len() > 1000 {
            self.windows
                .retain(|_, w| now.duration_since(w.started) < self.window);
        }

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        entry.count += 1;
        entry.count <= self.max_requests
    }
}

/// Middleware: отклоняет запросы при превышении лимита.
pub async fn rate_limit_middleware(
    rate_limiter: RateLimiter,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ip = extract_ip(&req);

    if !rate_limiter.check(&ip) {
        tracing::warn!("Rate limit превышен для IP: {ip}");
        return Err(AppError::TooManyRequests);
    }

    Ok(next.run(req).await)
}

/// Извлечь IP клиента (учитывает X-Forwarded-For).
pub fn extract_ip<B>(req: &Request<B>) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_per_key() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));

        assert!(limiter.check("1.1.1.1"));
        assert!(limiter.check("1.1.1.1"));
        assert!(!limiter.check("1.1.1.1"));
        assert!(limiter.check("2.2.2.2"), "Лимит считается отдельно для каждого IP");
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));

        assert!(limiter.check("ip"));
        assert!(!limiter.check("ip"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.check("ip"));
    }
}
