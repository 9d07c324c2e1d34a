//! Image download: one GET, accepted only for `200 OK` + an image content-type.
//!
//! The check is deliberately lenient. A body the server labels `image/*` is
//! accepted without decoding it; the model is the real judge of whether it
//! shows a chat. There is no retry and no timeout beyond what the shared
//! client was built with.

use crate::error::FetchError;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

/// Raw image bytes plus the content-type the server reported.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// URL the bytes were downloaded from.
    pub url: String,
    /// The `Content-Type` header value, verbatim.
    pub content_type: String,
    /// The response body, unchanged.
    pub bytes: Vec<u8>,
}

/// Download `url` and return its body if the server says it is an image.
///
/// Transport failures and failed checks are both returned as
/// [`FetchError`]; the variants differ only for logging.
pub async fn fetch_image(client: &reqwest::Client, url: &str) -> Result<FetchedImage, FetchError> {
    info!("Downloading image from: {}", url);

    let response = client.get(url).send().await.map_err(|e| {
        warn!("Download of {} failed: {}", url, e);
        FetchError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    })?;

    let status = response.status();
    if status != StatusCode::OK {
        warn!("Download of {} answered HTTP {}", url, status);
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !is_image_content_type(&content_type) {
        warn!("Download of {} is not an image: {:?}", url, content_type);
        return Err(FetchError::NotAnImage {
            url: url.to_string(),
            content_type,
        });
    }

    let bytes = response.bytes().await.map_err(|e| FetchError::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    debug!("Downloaded {} bytes ({})", bytes.len(), content_type);

    Ok(FetchedImage {
        url: url.to_string(),
        content_type,
        bytes: bytes.to_vec(),
    })
}

/// A content-type is acceptable when it mentions "image" anywhere.
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type.contains("image")
}
