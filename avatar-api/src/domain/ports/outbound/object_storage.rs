use async_trait::async_trait;

use crate::domain::{
    models::{ImagePayload, SignedUrl, StorageKey},
    StorageFailure,
};

#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Stores the payload at `key`, replacing any existing object.
    async fn upload(&self, key: &StorageKey, payload: ImagePayload) -> Result<(), StorageFailure>;

    async fn create_signed_url(
        &self,
        key: &StorageKey,
        ttl: time::Duration,
    ) -> Result<SignedUrl, StorageFailure>;

    /// Removes the object at `key`. Succeeds if there is nothing to remove.
    async fn delete(&self, key: &StorageKey) -> Result<(), StorageFailure>;

    /// Whether `url` is a signed read URL this storage issued for `key`.
    fn issued_for(&self, key: &StorageKey, url: &SignedUrl) -> bool;

    /// Downloads the object behind a signed URL. URLs this storage did not
    /// issue are rejected without being requested.
    async fn fetch(&self, url: &SignedUrl) -> Result<Vec<u8>, StorageFailure>;
}
