//! # shot2sheet
//!
//! Turn chat screenshots into spreadsheet rows using a Vision Language Model.
//!
//! An operator shares a public link to a screenshot of a conversation with a
//! prospective customer. The image is downloaded, a VLM reads the customer's
//! name, phone number, branch ("center") and the messaging app the chat came
//! from, and the result is appended as one row to a Google Sheet.
//!
//! ## Pipeline Overview
//!
//! ```text
//! link
//!  │
//!  ├─ 1. Resolve  rewrite Drive share links to direct downloads
//!  ├─ 2. Fetch    HTTP GET, must be 200 with an image content-type
//!  ├─ 3. Extract  one VLM call; quota errors retried with a fixed delay
//!  ├─ 4. Row      split the CSV reply into [link, name, phone, center, source]
//!  └─ 5. Append   Sheets values:append as the service account
//! ```
//!
//! Each stage either hands its output to the next or stops the submission
//! with a [`SubmissionError`]. A row is appended only when all four values
//! were extracted.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shot2sheet::{connect, PipelineConfig, Secrets};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Model key read from GEMINI_API_KEY.
//!     let config = PipelineConfig::default();
//!     let secrets = Secrets::new(
//!         std::env::var("SPREADSHEET_ID")?,
//!         &std::env::var("GOOGLE_SERVICE_ACCOUNT")?,
//!     )?;
//!     let pipeline = connect(&config, &secrets)?;
//!
//!     let report = pipeline.submit("https://example.com/chat.png").await?;
//!     println!("{:?}", report.row.values());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `shot2sheet` binary (clap + anyhow + dotenvy + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod observer;
pub mod pipeline;
pub mod prompts;
pub mod retry;
pub mod sheets;
pub mod submit;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder, Secrets};
pub use error::{
    Error, ExtractError, FetchError, ModelError, RowError, SheetError, Stage, SubmissionError,
};
pub use observer::{NoopObserver, ObserverHandle, SubmissionObserver};
pub use pipeline::encode::ImageSummary;
pub use pipeline::extract::{Extraction, LlmVisionModel, VisionModel};
pub use pipeline::link::direct_download_link;
pub use pipeline::row::{build_row, SheetRow, COLUMNS};
pub use retry::RetryPolicy;
pub use sheets::{AppendReceipt, RowSink, ServiceAccountKey, SheetsClient};
pub use submit::{connect, http_client, LivePipeline, Pipeline, SubmissionReport};
