use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::error::ApiError;

const JPEG_QUALITY: u8 = 85;

/// Re-encode a JPEG so the stored bytes are canonical: EXIF and any other
/// embedded metadata are dropped, and the declared orientation is baked into
/// the pixels first so the image still displays upright.
pub fn normalize_jpeg(bytes: &[u8]) -> Result<Vec<u8>, ApiError> {
    let orientation = read_orientation(bytes);

    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)
        .map_err(|e| ApiError::SignatureMismatch(format!("jpeg body failed to decode: {}", e)))?;

    let oriented = apply_orientation(img, orientation);

    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    oriented
        .write_with_encoder(encoder)
        .map_err(|e| ApiError::Internal(format!("jpeg re-encode failed: {}", e)))?;

    Ok(out.into_inner())
}

/// EXIF orientation tag value, 1 (upright) when absent or unreadable.
fn read_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(meta) => meta
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    }
}

fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
