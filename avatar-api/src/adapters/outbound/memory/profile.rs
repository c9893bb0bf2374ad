use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, RwLock,
    },
};

use async_trait::async_trait;

use crate::domain::{models::UserId, ports::outbound::ProfileRepository, ProfileError};

/// Profile store backed by a `HashMap`.
///
/// A profile maps to `None` when its avatar field was never set.
#[derive(Clone, Default)]
pub struct InMemoryProfileRepository {
    profiles: Arc<RwLock<HashMap<UserId, Option<String>>>>,
    write_failure: Arc<RwLock<Option<ProfileError>>>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, user_id: &UserId, avatar_url: Option<&str>) -> Self {
        self.profiles
            .write()
            .unwrap()
            .insert(user_id.clone(), avatar_url.map(str::to_string));
        self
    }

    pub fn fail_writes(&self, failure: Option<ProfileError>) {
        *self.write_failure.write().unwrap() = failure;
    }

    /// The raw field: `None` for a missing profile, `Some(None)` for an
    /// absent field.
    pub fn avatar_field(&self, user_id: &UserId) -> Option<Option<String>> {
        self.profiles.read().unwrap().get(user_id).cloned()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn set_avatar_url(&self, user_id: &UserId, url: &str) -> Result<(), ProfileError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        if let Some(failure) = self.write_failure.read().unwrap().clone() {
            return Err(failure);
        }

        let mut profiles = self.profiles.write().unwrap();
        let field = profiles
            .get_mut(user_id)
            .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))?;
        *field = Some(url.to_string());
        Ok(())
    }

    async fn get_avatar_url(&self, user_id: &UserId) -> Result<String, ProfileError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        self.profiles
            .read()
            .unwrap()
            .get(user_id)
            .map(|field| field.clone().unwrap_or_default())
            .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))
    }
}
