//! Key-value cache side channel
//!
//! The cache only ever holds derived data (order listings). Every helper in
//! this module is best-effort: failures are logged and swallowed so a cache
//! outage never fails a checkout.
//!
//! # Key layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `orders:user:{user_id}` | JSON array of the user's orders |
//! | `orders:detail:{order_id}` | JSON order |

mod memory;

pub use memory::MemoryCache;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Pattern covering every order listing and detail entry
pub const ORDERS_PATTERN: &str = "orders:*";

pub fn user_orders_key(user_id: i64) -> String {
    format!("orders:user:{}", user_id)
}

pub fn order_detail_key(order_id: i64) -> String {
    format!("orders:detail:{}", order_id)
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Cache backend
#[async_trait]
pub trait Cache: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Delete every key matching a glob pattern (`*` wildcard), returning the count
    async fn delete_by_pattern(&self, pattern: &str) -> Result<usize, CacheError>;
}

/// Read and decode a cached JSON value, treating any failure as a miss
pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Dropping undecodable cache entry");
                let _ = cache.delete(key).await;
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key, error = %e, "Cache read failed");
            None
        }
    }
}

/// Encode and store a JSON value
pub async fn set_json<T: Serialize>(cache: &dyn Cache, key: &str, value: &T, ttl: Duration) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(key, error = %e, "Cache value serialization failed");
            return;
        }
    };
    if let Err(e) = cache.set(key, raw, ttl).await {
        tracing::warn!(key, error = %e, "Cache write failed");
    }
}

/// Invalidate all keys matching `pattern`
pub async fn invalidate(cache: &dyn Cache, pattern: &str) {
    match cache.delete_by_pattern(pattern).await {
        Ok(removed) => tracing::debug!(pattern, removed, "Cache invalidated"),
        Err(e) => tracing::warn!(pattern, error = %e, "Cache invalidation failed"),
    }
}

/// Glob match supporting `*` (any run of characters)
pub(crate) fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }

    let mut rest = key;
    let first = parts[0];
    if !rest.starts_with(first) {
        return false;
    }
    rest = &rest[first.len()..];

    let last = parts[parts.len() - 1];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}
