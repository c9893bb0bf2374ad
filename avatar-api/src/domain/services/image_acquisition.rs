use std::sync::Arc;

use crate::domain::{
    models::{CameraPermission, ImagePayload, ImageSourceKind, LOW_QUALITY_THRESHOLD_BYTES},
    ports::{
        inbound::ImageRequest,
        outbound::{AvatarProcessor, CameraSource, GallerySource},
    },
    AvatarError,
};

pub const MAX_AVATAR_SIZE: usize = 5 * 1024 * 1024;

/// Turns a camera capture or a gallery selection into an [`ImagePayload`].
///
/// Reads from the source and nothing else; storage and profile state are
/// never touched here.
#[derive(Clone, Default)]
pub struct ImageAcquisition {
    processor: Option<Arc<dyn AvatarProcessor>>,
}

impl ImageAcquisition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_processor(processor: Arc<dyn AvatarProcessor>) -> Self {
        Self {
            processor: Some(processor),
        }
    }

    pub async fn acquire(&self, request: ImageRequest) -> Result<ImagePayload, AvatarError> {
        match request {
            ImageRequest::Camera { camera, permission } => {
                self.acquire_from_camera(camera.as_ref(), permission.as_ref())
                    .await
            }
            ImageRequest::Gallery(gallery) => self.acquire_from_gallery(gallery.as_ref()).await,
        }
    }

    pub async fn acquire_from_camera(
        &self,
        camera: &dyn CameraSource,
        permission: Option<&CameraPermission>,
    ) -> Result<ImagePayload, AvatarError> {
        let Some(permission) = permission else {
            tracing::info!("camera permission not granted, skipping capture");
            return Err(AvatarError::PermissionDenied);
        };

        let bytes = camera.capture(permission).await?;
        if bytes.is_empty() {
            return Err(AvatarError::acquisition("camera returned an empty image"));
        }

        self.finish(bytes, ImageSourceKind::Camera).await
    }

    pub async fn acquire_from_gallery(
        &self,
        gallery: &dyn GallerySource,
    ) -> Result<ImagePayload, AvatarError> {
        let bytes = gallery
            .select()
            .await?
            .ok_or(AvatarError::SelectionCancelled)?;

        if bytes.is_empty() {
            return Err(AvatarError::acquisition("selected image is empty"));
        }

        self.finish(bytes, ImageSourceKind::Gallery).await
    }

    async fn finish(
        &self,
        bytes: Vec<u8>,
        source: ImageSourceKind,
    ) -> Result<ImagePayload, AvatarError> {
        if bytes.len() > MAX_AVATAR_SIZE {
            return Err(AvatarError::PayloadTooLarge {
                limit: MAX_AVATAR_SIZE,
            });
        }

        // Judge quality on what the source produced, before re-encoding.
        let raw_size = bytes.len();
        let low_quality = raw_size < LOW_QUALITY_THRESHOLD_BYTES;

        let bytes = match &self.processor {
            Some(processor) => {
                let processor = Arc::clone(processor);
                tokio::task::spawn_blocking(move || processor.process(bytes))
                    .await
                    .map_err(|err| {
                        AvatarError::acquisition(format!("image processing task failed: {err}"))
                    })??
            }
            None => bytes,
        };

        if low_quality {
            tracing::warn!(
                %source,
                size = raw_size,
                "acquired image is very small, likely a thumbnail"
            );
        }

        let mut payload = ImagePayload::jpeg(bytes, source);
        payload.low_quality = low_quality;

        tracing::debug!(%source, size = payload.size(), "image acquired");
        Ok(payload)
    }
}
