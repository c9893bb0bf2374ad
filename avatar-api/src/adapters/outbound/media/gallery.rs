use std::{
    path::{Component, Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use crate::domain::{ports::outbound::GallerySource, services::MAX_AVATAR_SIZE, AvatarError};

/// A directory of images the server can pick avatars from.
#[derive(Debug, Clone)]
pub struct DirectoryGallery {
    root: PathBuf,
    read_limit: u64,
}

impl DirectoryGallery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_limit: MAX_AVATAR_SIZE as u64 + 1,
        }
    }

    /// Files are read up to `read_limit` bytes, enough for the acquisition
    /// step to tell that an image is too large.
    pub fn with_read_limit(mut self, read_limit: u64) -> Self {
        self.read_limit = read_limit;
        self
    }

    /// Resolves `name` to a file directly inside the gallery directory.
    pub fn entry(&self, name: &str) -> Result<GalleryFile, AvatarError> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file)), None) => Ok(GalleryFile {
                path: self.root.join(file),
                read_limit: self.read_limit,
            }),
            _ => Err(AvatarError::acquisition(format!(
                "invalid gallery entry {name:?}"
            ))),
        }
    }
}

/// One selected gallery file. A file that no longer exists counts as a
/// cancelled selection.
#[derive(Debug, Clone)]
pub struct GalleryFile {
    path: PathBuf,
    read_limit: u64,
}

impl GalleryFile {
    fn read_error(&self, err: std::io::Error) -> AvatarError {
        AvatarError::acquisition(format!("failed to read {}: {err}", self.path.display()))
    }
}

#[async_trait]
impl GallerySource for GalleryFile {
    async fn select(&self) -> Result<Option<Vec<u8>>, AvatarError> {
        let file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "gallery entry not found");
                return Ok(None);
            }
            Err(err) => return Err(self.read_error(err)),
        };

        let mut bytes = Vec::new();
        file.take(self.read_limit)
            .read_to_end(&mut bytes)
            .await
            .map_err(|err| self.read_error(err))?;

        Ok(Some(bytes))
    }
}

/// Bytes a client sent along with the request. `None` means no file was
/// attached.
pub struct UploadedImage(Mutex<Option<Vec<u8>>>);

impl UploadedImage {
    pub fn new(bytes: Option<Vec<u8>>) -> Self {
        Self(Mutex::new(bytes))
    }
}

#[async_trait]
impl GallerySource for UploadedImage {
    async fn select(&self) -> Result<Option<Vec<u8>>, AvatarError> {
        let mut bytes = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(bytes.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_file_from_gallery_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("beach.jpg"), b"jpeg bytes").unwrap();
        let gallery = DirectoryGallery::new(dir.path());

        let bytes = gallery.entry("beach.jpg").unwrap().select().await.unwrap();

        assert_eq!(bytes, Some(b"jpeg bytes".to_vec()));
    }

    #[tokio::test]
    async fn large_files_are_read_only_up_to_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("huge.jpg"), vec![0u8; 10_000]).unwrap();
        let gallery = DirectoryGallery::new(dir.path()).with_read_limit(1_001);

        let bytes = gallery.entry("huge.jpg").unwrap().select().await.unwrap();

        assert_eq!(bytes.map(|b| b.len()), Some(1_001));
    }

    #[tokio::test]
    async fn missing_file_is_a_cancelled_selection() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = DirectoryGallery::new(dir.path());

        let bytes = gallery.entry("gone.jpg").unwrap().select().await.unwrap();

        assert_eq!(bytes, None);
    }

    #[test]
    fn refuses_names_outside_the_directory() {
        let gallery = DirectoryGallery::new("/srv/gallery");

        for name in ["../etc/passwd", "/etc/passwd", "a/b.jpg", "..", ".", ""] {
            assert!(
                matches!(gallery.entry(name), Err(AvatarError::AcquisitionFailed(_))),
                "{name:?} should be refused"
            );
        }
    }

    #[tokio::test]
    async fn uploaded_image_hands_out_its_bytes_once() {
        let upload = UploadedImage::new(Some(vec![1, 2, 3]));

        assert_eq!(upload.select().await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(upload.select().await.unwrap(), None);
        assert_eq!(UploadedImage::new(None).select().await.unwrap(), None);
    }
}
