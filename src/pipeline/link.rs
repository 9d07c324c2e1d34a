//! Link normalisation for cloud-storage share links.
//!
//! Google Drive "view" links (`/file/d/<id>/view`, `open?id=<id>`) answer
//! with an HTML preview page, not the image. Both shapes are rewritten to
//! the `uc?export=download` endpoint. Any other URL passes through
//! untouched. Pure string inspection; no network access.

/// Host marker for recognised share links.
pub const DRIVE_HOST: &str = "drive.google.com";

/// Direct-download template; the file id is appended.
const DRIVE_DOWNLOAD_PREFIX: &str = "https://drive.google.com/uc?export=download&id=";

/// Rewrite `link` into a URL that serves the raw file.
///
/// * Not a Drive link → `Some(link)` unchanged.
/// * Drive link with `id=<X>` → `X` is everything after the last `id=` up to
///   the next `&`.
/// * Drive link with `/d/<X>/` → `X` is everything after the first `/d/` up
///   to the next `/`.
/// * Drive link matching neither → `None`; the original link is **not**
///   returned because fetching it would only yield the preview page.
pub fn direct_download_link(link: &str) -> Option<String> {
    if !link.contains(DRIVE_HOST) {
        return Some(link.to_string());
    }
    drive_file_id(link).map(|id| format!("{DRIVE_DOWNLOAD_PREFIX}{id}"))
}

/// Extract the Drive file id, preferring the `id=` query form.
fn drive_file_id(link: &str) -> Option<&str> {
    if let Some((_, tail)) = link.rsplit_once("id=") {
        return tail.split('&').next();
    }
    if let Some((_, tail)) = link.split_once("/d/") {
        return tail.split('/').next();
    }
    None
}
