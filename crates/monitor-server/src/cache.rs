//! Кэш с TTL: быстрая проекция записей серверов.
//!
//! Кэш не является источником истины. Любая ошибка кэша обрабатывается
//! вызывающей стороной как промах и только логируется.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// TTL записи кэша, обновляется при каждой записи.
pub const CACHE_TTL: Duration = Duration::from_secs(600);

/// Ключ кэша для адреса сервера.
pub fn server_key(ip: &str) -> String {
    format!("server:{ip}")
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Кэш недоступен: {0}")]
    Unavailable(String),

    #[error("Повреждённая запись кэша: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Хранилище JSON-проекций с ограниченным временем жизни.
#[async_trait]
pub trait ServerCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Записать значение, заменяя и значение, и TTL.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// Кэш в памяти процесса.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ServerCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        }
        // Истёкшая запись удаляется лениво
        self.entries.remove_if(key, |_, e| e.expires_at <= now);
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();

        // Периодическая очистка при росте таблицы
        if self.entries.len() > 1000 {
            self.entries.retain(|_, e| e.expires_at > now);
        }

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();
        cache
            .set_ex("server:1.1.1.1", "{}".into(), CACHE_TTL)
            .await
            .unwrap();

        assert_eq!(
            cache.get("server:1.1.1.1").await.unwrap().as_deref(),
            Some("{}")
        );
        assert_eq!(cache.get("server:2.2.2.2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache
            .set_ex("k", "v".into(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty(), "Истёкшая запись должна быть удалена");
    }

    #[tokio::test]
    async fn test_set_replaces_ttl() {
        let cache = MemoryCache::new();
        cache
            .set_ex("k", "old".into(), Duration::from_millis(10))
            .await
            .unwrap();
        cache.set_ex("k", "new".into(), CACHE_TTL).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
    }
}
