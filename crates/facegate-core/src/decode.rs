//! Base64 image payload decoding.

use base64::Engine;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unsupported image data: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode a base64 image, optionally prefixed by a data-URI header
/// such as `data:image/jpeg;base64,`.
pub fn decode_base64_image(data: &str) -> Result<DynamicImage, DecodeError> {
    let payload = match data.split_once(',') {
        Some((_, rest)) => rest,
        None => data,
    };
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Encode raw image file bytes for transport.
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
