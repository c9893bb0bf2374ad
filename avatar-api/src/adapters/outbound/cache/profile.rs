//! Read-through cache in front of a profile store.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use moka::sync::Cache;

use crate::domain::{models::UserId, ports::outbound::ProfileRepository, ProfileError};

const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Default time-to-live for cached avatar URLs (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Caches avatar URLs per user for a short time.
///
/// Successful writes replace the cached value. Failed writes evict it, so the
/// next read goes back to the store. Missing profiles are never cached.
///
/// Every write bumps a generation counter. A read that missed the cache only
/// fills it if no write happened while it was waiting on the store.
pub struct CachedProfileRepository<P> {
    inner: Arc<P>,
    cache: Cache<UserId, String>,
    generation: Mutex<u64>,
}

impl<P> CachedProfileRepository<P> {
    pub fn new(inner: Arc<P>) -> Self {
        Self::with_config(inner, DEFAULT_CACHE_CAPACITY, DEFAULT_TTL)
    }

    pub fn with_config(inner: Arc<P>, max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self {
            inner,
            cache,
            generation: Mutex::new(0),
        }
    }

    fn current_generation(&self) -> u64 {
        *self.generation.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<P: ProfileRepository> ProfileRepository for CachedProfileRepository<P> {
    async fn set_avatar_url(&self, user_id: &UserId, url: &str) -> Result<(), ProfileError> {
        let result = self.inner.set_avatar_url(user_id, url).await;

        let mut generation = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        *generation += 1;
        match &result {
            Ok(()) => self.cache.insert(user_id.clone(), url.to_string()),
            Err(_) => self.cache.invalidate(user_id),
        }

        result
    }

    async fn get_avatar_url(&self, user_id: &UserId) -> Result<String, ProfileError> {
        if let Some(url) = self.cache.get(user_id) {
            tracing::trace!(%user_id, "avatar url cache hit");
            return Ok(url);
        }

        let started = self.current_generation();
        let url = self.inner.get_avatar_url(user_id).await?;

        let generation = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        if *generation == started {
            self.cache.insert(user_id.clone(), url.clone());
        } else {
            tracing::trace!(%user_id, "avatar url changed during read, not caching");
        }
        drop(generation);

        Ok(url)
    }
}
