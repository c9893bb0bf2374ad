//! HTTP request and response types for the avatar endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::models::SignedUrl;

/// Response for the current avatar endpoint. `avatar_url` is empty when the
/// user has no avatar.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUrlResponse {
    pub avatar_url: String,
}

/// Response for a completed upload or commit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarChangedResponse {
    pub avatar_url: SignedUrl,
    /// The source image was small enough to likely be a thumbnail.
    pub low_quality: bool,
}

/// Body of a metadata-only retry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitAvatarRequest {
    pub signed_url: String,
    #[serde(default)]
    pub low_quality: bool,
}
