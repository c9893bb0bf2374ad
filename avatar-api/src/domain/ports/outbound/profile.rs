use async_trait::async_trait;

use crate::domain::{models::UserId, ProfileError};

#[async_trait]
pub trait ProfileRepository: Send + Sync + 'static {
    /// Overwrites the avatar field of an existing profile. An empty `url`
    /// clears the avatar.
    async fn set_avatar_url(&self, user_id: &UserId, url: &str) -> Result<(), ProfileError>;

    /// Returns `""` when the profile has no avatar, whether the field is
    /// empty or absent.
    async fn get_avatar_url(&self, user_id: &UserId) -> Result<String, ProfileError>;
}
