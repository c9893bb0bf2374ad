use async_trait::async_trait;

use crate::domain::{models::CameraPermission, AvatarError};

#[async_trait]
pub trait CameraSource: Send + Sync + 'static {
    async fn capture(&self, permission: &CameraPermission) -> Result<Vec<u8>, AvatarError>;
}

#[async_trait]
pub trait GallerySource: Send + Sync + 'static {
    /// `Ok(None)` means the user backed out of the selection.
    async fn select(&self) -> Result<Option<Vec<u8>>, AvatarError>;
}
