use image::ImageReader;
use std::io::Cursor;

use super::error::AcquireError;
use crate::render::Bitmap;

/// Decode a fetched payload into an RGBA bitmap; the format is sniffed from the bytes
pub fn decode_bitmap(payload: &[u8]) -> Result<Bitmap, AcquireError> {
    if payload.is_empty() {
        return Err(AcquireError::EmptyPayload);
    }
    let image = ImageReader::new(Cursor::new(payload))
        .with_guessed_format()
        .map_err(|e| AcquireError::Decode(image::ImageError::IoError(e)))?
        .decode()?;
    Ok(Bitmap::new(image.into_rgba8()))
}
