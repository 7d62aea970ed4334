use image::codecs::jpeg::JpegEncoder;
use image::{ImageReader, RgbImage};
use std::io::Cursor;

/// A decoded camera frame with capture metadata.
///
/// Pixels are always held as 8-bit RGB regardless of what the camera sent,
/// so every frame of one run compares like-for-like.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub captured_at_ms: i64,
    pub seq: u64,
}

impl Frame {
    pub fn new(image: RgbImage, captured_at_ms: i64, seq: u64) -> Self {
        Self {
            image,
            captured_at_ms,
            seq,
        }
    }

    /// Decode an encoded still (JPEG from IP cameras in practice; the format is guessed).
    pub fn from_jpeg(data: &[u8], captured_at_ms: i64, seq: u64) -> Result<Self, FrameError> {
        if data.is_empty() {
            return Err(FrameError::Empty);
        }
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| FrameError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| FrameError::Decode(e.to_string()))?;
        Ok(Self::new(img.to_rgb8(), captured_at_ms, seq))
    }

    /// Encode as JPEG at the given quality (1..=100).
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, FrameError> {
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality)
            .encode_image(&self.image)
            .map_err(|e| FrameError::Encode(e.to_string()))?;
        Ok(buf)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// True when the frame has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame payload is empty")]
    Empty,
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn checker(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([200, 40, 40])
            } else {
                Rgb([30, 30, 180])
            }
        })
    }

    #[test]
    fn jpeg_encode_then_decode_keeps_dimensions() {
        let frame = Frame::new(checker(32, 24), 1708300000000, 7);
        let bytes = frame.encode_jpeg(90).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = Frame::from_jpeg(&bytes, 1708300000500, 8).unwrap();
        assert_eq!(decoded.dimensions(), (32, 24));
        assert_eq!(decoded.captured_at_ms, 1708300000500);
        assert_eq!(decoded.seq, 8);
    }

    #[test]
    fn empty_payload_rejected() {
        assert!(matches!(Frame::from_jpeg(&[], 0, 0), Err(FrameError::Empty)));
    }

    #[test]
    fn garbage_payload_is_decode_error() {
        let result = Frame::from_jpeg(&[0x00, 0x01, 0x02, 0x03], 0, 0);
        assert!(matches!(result, Err(FrameError::Decode(_))));
    }

    #[test]
    fn zero_area_frame_is_empty() {
        let frame = Frame::new(RgbImage::new(0, 10), 0, 0);
        assert!(frame.is_empty());
        assert!(!Frame::new(checker(1, 1), 0, 0).is_empty());
    }
}
