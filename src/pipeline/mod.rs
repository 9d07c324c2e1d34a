//! Pipeline stages for screenshot-to-sheet submissions.
//!
//! Each submodule implements exactly one transformation step, chained
//! linearly by [`crate::Pipeline::submit`]. No stage calls back into an
//! earlier one.
//!
//! ## Data Flow
//!
//! ```text
//! link ──▶ fetch ──▶ encode ──▶ extract ──▶ postprocess ──▶ row ──▶ sheets
//! (share)  (GET)     (base64)   (VLM)       (cleanup)       (5 cols) (append)
//! ```
//!
//! 1. [`link`]   : rewrite cloud-storage share links to direct downloads
//! 2. [`fetch`]  : one GET, accepted only for 200 + `image/*`
//! 3. [`encode`] : base64-wrap the bytes for the multimodal request body
//! 4. [`extract`]: the model call under the quota retry policy; the only
//!    stage that may sleep
//! 5. [`postprocess`]: strip fences and invisible characters from the reply
//! 6. [`row`]    : split the CSV reply into the fixed five-column row

pub mod encode;
pub mod extract;
pub mod fetch;
pub mod link;
pub mod postprocess;
pub mod row;
