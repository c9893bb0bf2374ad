use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    models::{CameraPermission, PendingCommit, SignedUrl, UserId, WorkflowRun},
    ports::outbound::{AvatarEventSink, CameraSource, GallerySource},
    AvatarError,
};

/// Where the new avatar comes from.
pub enum ImageRequest {
    Camera {
        camera: Arc<dyn CameraSource>,
        permission: Option<CameraPermission>,
    },
    Gallery(Box<dyn GallerySource>),
}

#[async_trait]
pub trait AvatarService: Send + Sync + 'static {
    /// Acquire, upload, sign and commit a new avatar.
    async fn change_avatar(
        &self,
        user_id: &UserId,
        request: ImageRequest,
        sink: &dyn AvatarEventSink,
    ) -> WorkflowRun;

    /// Repeat only the profile write of a run that failed while committing.
    async fn retry_commit(&self, pending: PendingCommit, sink: &dyn AvatarEventSink)
        -> WorkflowRun;

    /// Whether `url` is a signed URL the storage issued for this user's
    /// avatar object. Only such URLs may be committed.
    fn owns_avatar_url(&self, user_id: &UserId, url: &SignedUrl) -> bool;

    /// Clear the profile field, then delete the stored object on a best-effort
    /// basis.
    async fn remove_avatar(&self, user_id: &UserId, sink: &dyn AvatarEventSink) -> WorkflowRun;

    async fn current_avatar(&self, user_id: &UserId) -> Result<Option<String>, AvatarError>;

    async fn fetch_avatar(&self, user_id: &UserId) -> Result<Option<Vec<u8>>, AvatarError>;
}
