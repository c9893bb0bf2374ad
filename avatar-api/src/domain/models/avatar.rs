use std::fmt;

use serde::Serialize;
use strum::Display;

use super::UserId;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Payloads smaller than this are most likely thumbnails returned by a
/// capture backend instead of the full image.
pub const LOW_QUALITY_THRESHOLD_BYTES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageSourceKind {
    Camera,
    Gallery,
}

/// An acquired image, owned by a single workflow run until it is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub source: ImageSourceKind,
    pub low_quality: bool,
}

impl ImagePayload {
    pub fn jpeg(bytes: Vec<u8>, source: ImageSourceKind) -> Self {
        let low_quality = bytes.len() < LOW_QUALITY_THRESHOLD_BYTES;
        Self {
            bytes,
            content_type: JPEG_CONTENT_TYPE.to_string(),
            source,
            low_quality,
        }
    }

    /// Size of the encoded image in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// The object key of a user's avatar, `pfp/{user_id}.jpg`.
///
/// Re-uploads for the same user land on the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn for_user(user_id: &UserId) -> Self {
        Self(format!("pfp/{}.jpg", user_id.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A time-limited read URL issued by the storage service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SignedUrl(String);

impl SignedUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SignedUrl> for String {
    fn from(url: SignedUrl) -> Self {
        url.0
    }
}

/// Proof that the camera permission was granted by the host.
///
/// The domain never creates one itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraPermission(());

impl CameraPermission {
    pub fn granted() -> Self {
        Self(())
    }
}
