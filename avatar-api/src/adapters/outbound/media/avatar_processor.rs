use std::io::Cursor;

use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, ImageFormat};

use crate::domain::{ports::outbound::AvatarProcessor, AvatarError};

const DEFAULT_QUALITY: u8 = 90;
const MAX_DIMENSION: u32 = 1024;

/// Re-encodes non-JPEG input as JPEG. JPEG input is passed through untouched.
pub struct JpegAvatarProcessor {
    quality: u8,
}

impl JpegAvatarProcessor {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for JpegAvatarProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl AvatarProcessor for JpegAvatarProcessor {
    fn process(&self, input: Vec<u8>) -> Result<Vec<u8>, AvatarError> {
        if matches!(image::guess_format(&input), Ok(ImageFormat::Jpeg)) {
            return Ok(input);
        }

        let mut image = image::load_from_memory(&input)
            .map_err(|err| AvatarError::acquisition(format!("unreadable image: {err}")))?;

        if image.width() > MAX_DIMENSION || image.height() > MAX_DIMENSION {
            image = image.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3);
        }

        // JPEG has no alpha channel.
        let rgb = image.to_rgb8();

        let mut output = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut output, self.quality)
            .encode_image(&rgb)
            .map_err(|err| AvatarError::acquisition(format!("jpeg encoding failed: {err}")))?;

        Ok(output.into_inner())
    }
}
