mod avatar_processor;
mod camera;
mod gallery;

pub use avatar_processor::JpegAvatarProcessor;
pub use camera::CommandCamera;
pub use gallery::{DirectoryGallery, GalleryFile, UploadedImage};
