use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use crate::domain::{
    models::{ImagePayload, SignedUrl, StorageKey},
    ports::outbound::ObjectStorage,
    StorageFailure,
};

const SIGN_PREFIX: &str = "memory://storage/v1/object/sign/avatars/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    Upload(String),
    Sign(String),
    Delete(String),
    Fetch(String),
}

#[derive(Default)]
struct StorageState {
    objects: HashMap<String, Vec<u8>>,
    calls: Vec<StorageCall>,
    upload_failure: Option<StorageFailure>,
    sign_failure: Option<StorageFailure>,
    delete_failure: Option<StorageFailure>,
    issued: u64,
}

/// Object storage backed by a `HashMap`, with switchable failures.
///
/// Signing a key that was never uploaded fails with `NotFound`, like the
/// real service.
#[derive(Clone, Default)]
pub struct InMemoryObjectStorage {
    state: Arc<RwLock<StorageState>>,
}

#[allow(dead_code)]
impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, key: &StorageKey, bytes: Vec<u8>) -> Self {
        self.state
            .write()
            .unwrap()
            .objects
            .insert(key.as_str().to_string(), bytes);
        self
    }

    pub fn fail_uploads(&self, failure: Option<StorageFailure>) {
        self.state.write().unwrap().upload_failure = failure;
    }

    pub fn fail_signing(&self, failure: Option<StorageFailure>) {
        self.state.write().unwrap().sign_failure = failure;
    }

    pub fn fail_deletes(&self, failure: Option<StorageFailure>) {
        self.state.write().unwrap().delete_failure = failure;
    }

    pub fn object(&self, key: &StorageKey) -> Option<Vec<u8>> {
        self.state.read().unwrap().objects.get(key.as_str()).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap().objects.len()
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.state.read().unwrap().calls.clone()
    }

    pub fn upload_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StorageCall::Upload(_)))
            .count()
    }

    pub fn sign_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StorageCall::Sign(_)))
            .count()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn upload(&self, key: &StorageKey, payload: ImagePayload) -> Result<(), StorageFailure> {
        let mut state = self.state.write().unwrap();
        state.calls.push(StorageCall::Upload(key.as_str().to_string()));

        if let Some(failure) = state.upload_failure.clone() {
            return Err(failure);
        }

        state
            .objects
            .insert(key.as_str().to_string(), payload.bytes);
        Ok(())
    }

    async fn create_signed_url(
        &self,
        key: &StorageKey,
        ttl: time::Duration,
    ) -> Result<SignedUrl, StorageFailure> {
        let mut state = self.state.write().unwrap();
        state.calls.push(StorageCall::Sign(key.as_str().to_string()));

        if let Some(failure) = state.sign_failure.clone() {
            return Err(failure);
        }
        if !state.objects.contains_key(key.as_str()) {
            return Err(StorageFailure::NotFound);
        }

        state.issued += 1;
        Ok(SignedUrl::new(format!(
            "{SIGN_PREFIX}{}?token={}&expires_in={}",
            key.as_str(),
            state.issued,
            ttl.whole_seconds()
        )))
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), StorageFailure> {
        let mut state = self.state.write().unwrap();
        state.calls.push(StorageCall::Delete(key.as_str().to_string()));

        if let Some(failure) = state.delete_failure.clone() {
            return Err(failure);
        }

        state.objects.remove(key.as_str());
        Ok(())
    }

    fn issued_for(&self, key: &StorageKey, url: &SignedUrl) -> bool {
        url.as_str()
            .strip_prefix(SIGN_PREFIX)
            .and_then(|rest| rest.strip_prefix(key.as_str()))
            .is_some_and(|rest| rest.starts_with('?'))
    }

    async fn fetch(&self, url: &SignedUrl) -> Result<Vec<u8>, StorageFailure> {
        let mut state = self.state.write().unwrap();
        state.calls.push(StorageCall::Fetch(url.as_str().to_string()));

        let key = url
            .as_str()
            .strip_prefix(SIGN_PREFIX)
            .and_then(|rest| rest.split('?').next())
            .ok_or_else(|| StorageFailure::Rejected("not a signed url".to_string()))?;

        state
            .objects
            .get(key)
            .cloned()
            .ok_or(StorageFailure::NotFound)
    }
}
