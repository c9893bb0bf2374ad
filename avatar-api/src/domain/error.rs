use thiserror::Error;

/// Failures reported by an object storage adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageFailure {
    #[error("storage is not configured")]
    ConfigMissing,
    #[error("network error: {0}")]
    Network(String),
    #[error("storage credentials rejected")]
    Unauthorized,
    #[error("object not found")]
    NotFound,
    #[error("storage rejected the request: {0}")]
    Rejected(String),
    #[error("storage server error: {0}")]
    Server(String),
}

impl StorageFailure {
    /// Whether a manual retry of the same step may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server(_))
    }
}

/// Failures reported by a profile store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("no profile for user {0}")]
    NotFound(String),
    #[error("profile store error: {0}")]
    Store(String),
}

/// Errors that can occur while changing or removing an avatar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvatarError {
    #[error("invalid user id: {0:?}")]
    InvalidUserId(String),
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("image selection cancelled")]
    SelectionCancelled,
    #[error("image acquisition failed: {0}")]
    AcquisitionFailed(String),
    #[error("image exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error("upload failed: {0}")]
    UploadFailed(StorageFailure),
    #[error("signing failed: {0}")]
    SigningFailed(StorageFailure),
    #[error("profile update failed: {0}")]
    MetadataWriteFailed(ProfileError),
    #[error("profile read failed: {0}")]
    ProfileReadFailed(ProfileError),
    #[error("delete failed: {0}")]
    DeleteFailed(StorageFailure),
    #[error("avatar fetch failed: {0}")]
    FetchFailed(StorageFailure),
}

impl AvatarError {
    pub fn acquisition(reason: impl Into<String>) -> Self {
        Self::AcquisitionFailed(reason.into())
    }
}
