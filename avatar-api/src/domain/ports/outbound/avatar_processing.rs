use crate::domain::AvatarError;

/// Normalises acquired image bytes to JPEG.
pub trait AvatarProcessor: Send + Sync + 'static {
    fn process(&self, input: Vec<u8>) -> Result<Vec<u8>, AvatarError>;
}
