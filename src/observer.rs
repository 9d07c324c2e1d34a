//! Stage-event callback trait for submissions.
//!
//! Inject an [`Arc<dyn SubmissionObserver>`] via
//! [`crate::Pipeline::with_observer`] to receive events as a submission moves
//! through the stages. The CLI uses it to drive its spinner and print each
//! intermediate result; a web front-end could forward the same events to a
//! socket without the library knowing anything about it.
//!
//! # Example
//!
//! ```rust
//! use shot2sheet::SubmissionObserver;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct RetryCounter(AtomicUsize);
//!
//! impl SubmissionObserver for RetryCounter {
//!     fn on_rate_limited(&self, attempt: u32, max_attempts: u32, _wait_secs: u64) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("rate limited ({attempt}/{max_attempts})");
//!     }
//! }
//! ```

use crate::error::Stage;
use crate::pipeline::encode::ImageSummary;
use crate::pipeline::row::SheetRow;
use crate::sheets::AppendReceipt;
use std::sync::Arc;

/// Called by [`crate::Pipeline::submit`] as a submission advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait SubmissionObserver: Send + Sync {
    /// Called once, before the link is resolved.
    fn on_submission_start(&self, raw_link: &str) {
        let _ = raw_link;
    }

    /// Called after the link normaliser produced a fetchable URL.
    fn on_link_resolved(&self, raw_link: &str, resolved: &str) {
        let _ = (raw_link, resolved);
    }

    /// Called once the image bytes are in memory.
    fn on_image_fetched(&self, url: &str, summary: &ImageSummary) {
        let _ = (url, summary);
    }

    /// Called when a model attempt was rate-limited and another will follow.
    fn on_rate_limited(&self, attempt: u32, max_attempts: u32, wait_secs: u64) {
        let _ = (attempt, max_attempts, wait_secs);
    }

    /// Called with the model's trimmed reply.
    fn on_extraction_complete(&self, text: &str) {
        let _ = text;
    }

    /// Called after the spreadsheet accepted the row.
    fn on_row_appended(&self, row: &SheetRow, receipt: &AppendReceipt) {
        let _ = (row, receipt);
    }

    /// Called when a stage halts the submission.
    ///
    /// `message` is the operator-facing text for the failure.
    fn on_stage_error(&self, stage: Stage, message: String) {
        let _ = (stage, message);
    }
}

/// A no-op implementation for callers that don't need stage events.
///
/// This is the default when no observer is configured.
pub struct NoopObserver;

impl SubmissionObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::Pipeline`].
pub type ObserverHandle = Arc<dyn SubmissionObserver>;
