//! Database-backed key/value cache
//!
//! Values are stored as JSON with an absolute expiry time. Expired rows are
//! treated as missing and removed lazily by `get` or in bulk by
//! `clear_expired`.

use chrono::{Duration, NaiveDateTime};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::dates::now_naive;
use crate::{Error, Result};

/// Lifetime of the front page entries (blog, tweets, photos)
pub const DEFAULT_TTL_SECONDS: i64 = 60 * 10;

/// Cache handle over the `cache` table
#[derive(Clone)]
pub struct Cache {
    pool: SqlitePool,
}

impl Cache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch a live value. Missing, expired and undecodable entries are `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get_at(key, now_naive()).await
    }

    async fn get_at<T: DeserializeOwned>(&self, key: &str, now: NaiveDateTime) -> Result<Option<T>> {
        let row: Option<(String, NaiveDateTime)> =
            sqlx::query_as("SELECT value, expires FROM cache WHERE cache_key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        let Some((value, expires)) = row else {
            return Ok(None);
        };

        if expires <= now {
            debug!(key, "Cache entry expired");
            self.delete(key).await?;
            return Ok(None);
        }

        match serde_json::from_str(&value) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(e) => {
                debug!(key, error = %e, "Discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Store a value for `ttl_seconds`
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: i64) -> Result<()> {
        let encoded = serde_json::to_string(value)
            .map_err(|source| Error::CacheEncode {
            key: key.to_string(),
            source,
        })?;
        let expires = now_naive() + Duration::seconds(ttl_seconds);

        sqlx::query(
            r#"
            INSERT INTO cache (cache_key, value, expires) VALUES (?, ?, ?)
            ON CONFLICT(cache_key) DO UPDATE SET
                value = excluded.value,
                expires = excluded.expires
            "#,
        )
        .bind(key)
        .bind(encoded)
        .bind(expires)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM cache WHERE cache_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Entries that have not expired yet
    pub async fn live_entries(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache WHERE expires > ?")
            .bind(now_naive())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Remove every expired entry, returning how many were dropped
    pub async fn clear_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cache WHERE expires <= ?")
            .bind(now_naive())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Cache) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("cache.db")).await.unwrap();
        (dir, Cache::new(pool))
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (_dir, cache) = setup().await;
        cache.set("tweets", &vec!["a".to_string(), "b".to_string()], 60).await.unwrap();

        let value: Option<Vec<String>> = cache.get("tweets").await.unwrap();
        assert_eq!(value, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[tokio::test]
    async fn test_empty_list_is_a_hit() {
        let (_dir, cache) = setup().await;
        cache.set("tweets", &Vec::<String>::new(), 60).await.unwrap();

        let value: Option<Vec<String>> = cache.get("tweets").await.unwrap();
        assert_eq!(value, Some(vec![]));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let (_dir, cache) = setup().await;
        let value: Option<String> = cache.get("blog").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let (_dir, cache) = setup().await;
        cache.set("blog", &"stale".to_string(), 60).await.unwrap();

        let later = now_naive() + Duration::seconds(61);
        let value: Option<String> = cache.get_at("blog", later).await.unwrap();
        assert!(value.is_none());

        // Lazily deleted
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache")
            .fetch_one(&cache.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_overwrite_and_clear_expired() {
        let (_dir, cache) = setup().await;
        cache.set("photos", &1, 60).await.unwrap();
        cache.set("photos", &2, 60).await.unwrap();
        cache.set("old", &3, -5).await.unwrap();

        let value: Option<i32> = cache.get("photos").await.unwrap();
        assert_eq!(value, Some(2));
        assert_eq!(cache.clear_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_live_entries_skip_expired() {
        let (_dir, cache) = setup().await;
        cache.set("blog", &"a", 60).await.unwrap();
        cache.set("tweets", &"b", 60).await.unwrap();
        cache.set("old", &"c", -5).await.unwrap();

        assert_eq!(cache.live_entries().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unencodable_value_is_rejected() {
        let (_dir, cache) = setup().await;
        let mut value = std::collections::BTreeMap::new();
        value.insert(vec![1u8], 1);

        match cache.set("photos", &value, 60).await {
            Err(Error::CacheEncode { key, .. }) => assert_eq!(key, "photos"),
            other => panic!("expected CacheEncode, got {:?}", other),
        }
        assert_eq!(cache.live_entries().await.unwrap(), 0);
    }
}
