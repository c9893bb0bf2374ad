use async_trait::async_trait;
use supabase_storage::{StorageClient, StorageError};

use crate::domain::{
    models::{ImagePayload, SignedUrl, StorageKey},
    ports::outbound::ObjectStorage,
    StorageFailure,
};

/// Adapter that wraps the Supabase storage client to implement the
/// ObjectStorage port.
pub struct SupabaseObjectStorage {
    client: StorageClient,
}

impl SupabaseObjectStorage {
    pub fn new(client: StorageClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStorage for SupabaseObjectStorage {
    async fn upload(&self, key: &StorageKey, payload: ImagePayload) -> Result<(), StorageFailure> {
        self.client
            .upload(key.as_str(), payload.bytes, &payload.content_type, true)
            .await
            .map_err(map_storage_error)
    }

    async fn create_signed_url(
        &self,
        key: &StorageKey,
        ttl: time::Duration,
    ) -> Result<SignedUrl, StorageFailure> {
        self.client
            .create_signed_url(key.as_str(), ttl)
            .await
            .map(SignedUrl::new)
            .map_err(map_storage_error)
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), StorageFailure> {
        self.client
            .delete(key.as_str())
            .await
            .map_err(map_storage_error)
    }

    fn issued_for(&self, key: &StorageKey, url: &SignedUrl) -> bool {
        self.client.is_signed_url_for(key.as_str(), url.as_str())
    }

    async fn fetch(&self, url: &SignedUrl) -> Result<Vec<u8>, StorageFailure> {
        self.client
            .download(url.as_str())
            .await
            .map_err(map_storage_error)
    }
}

fn map_storage_error(e: StorageError) -> StorageFailure {
    match e {
        StorageError::ConfigMissing => StorageFailure::ConfigMissing,
        StorageError::Transport(msg) => StorageFailure::Network(msg),
        StorageError::Unauthorized => StorageFailure::Unauthorized,
        StorageError::NotFound => StorageFailure::NotFound,
        StorageError::Server { status, message } => {
            StorageFailure::Server(format!("{status}: {message}"))
        }
        StorageError::Rejected { status, message } => {
            StorageFailure::Rejected(format!("{status}: {message}"))
        }
        StorageError::Parsing(msg) => StorageFailure::Rejected(msg),
        StorageError::ForeignUrl(url) => {
            StorageFailure::Rejected(format!("refusing to fetch {url}"))
        }
    }
}
