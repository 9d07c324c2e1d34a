//! Image encoding: raw bytes → base64 wrapped in `ImageData`.
//!
//! VLM APIs accept images as base64 payloads embedded in the JSON request
//! body together with a MIME type. The bytes are sent as downloaded; no
//! re-encoding, since screenshots arrive as PNG/JPEG/WebP already.

use crate::pipeline::fetch::FetchedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::ImageReader;
use serde::Serialize;
use std::io::Cursor;
use tracing::debug;

/// MIME type used when neither the bytes nor the server identify the format.
pub const FALLBACK_MIME: &str = "image/jpeg";

/// What the operator is shown about a fetched image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    /// MIME type sent to the model.
    pub mime_type: String,
    /// Pixel dimensions, when the format is decodable.
    pub dimensions: Option<(u32, u32)>,
    /// Body size in bytes.
    pub byte_len: usize,
}

/// Encode the image for the VLM API.
pub fn encode_image(image: &FetchedImage) -> ImageData {
    let mime = mime_type(image);
    let b64 = STANDARD.encode(&image.bytes);
    debug!("Encoded image → {} bytes base64 ({})", b64.len(), mime);
    ImageData::new(b64, &mime)
}

/// MIME type for the model payload.
///
/// Sniffed from the magic bytes first: file hosts often label everything
/// `image/jpeg` or `image/*`. Falls back to the server's header when it is
/// a concrete `image/<subtype>`, then to [`FALLBACK_MIME`].
pub fn mime_type(image: &FetchedImage) -> String {
    if let Ok(format) = image::guess_format(&image.bytes) {
        return format.to_mime_type().to_string();
    }
    let header = image
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    match header.split_once('/') {
        Some(("image", sub)) if !sub.is_empty() && sub != "*" => header.to_string(),
        _ => FALLBACK_MIME.to_string(),
    }
}

/// Describe the image without fully decoding it.
pub fn summarize(image: &FetchedImage) -> ImageSummary {
    let dimensions = ImageReader::new(Cursor::new(&image.bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());

    ImageSummary {
        mime_type: mime_type(image),
        dimensions,
        byte_len: image.bytes.len(),
    }
}
