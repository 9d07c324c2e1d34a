//! Submission entry points: one link in, one appended row out.
//!
//! A [`Pipeline`] is built once per process from the configuration and
//! secrets and then reused for every link the operator submits. It holds no
//! per-submission state; each call to [`Pipeline::submit`] runs the stages
//! strictly in order and stops at the first failing one.

use crate::config::{require_model_key, PipelineConfig, Secrets};
use crate::error::{Error, FetchError, SubmissionError};
use crate::observer::{NoopObserver, ObserverHandle};
use crate::pipeline::encode::{self, ImageSummary};
use crate::pipeline::extract::{ExtractionClient, LlmVisionModel, VisionModel};
use crate::pipeline::fetch::fetch_image;
use crate::pipeline::row::{build_row, SheetRow};
use crate::pipeline::{link, postprocess};
use crate::sheets::{AppendReceipt, RowSink, SheetsClient};
use edgequake_llm::{LLMProvider, ProviderFactory};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything a successful submission produced.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReport {
    /// The link as the operator pasted it (trimmed).
    pub raw_link: String,
    /// The URL the image was actually downloaded from.
    pub resolved_link: String,
    pub image: ImageSummary,
    /// The model's reply, trimmed but otherwise as received.
    pub extraction: String,
    /// Model calls used, including the successful one.
    pub attempts: u32,
    pub row: SheetRow,
    pub receipt: AppendReceipt,
    pub duration_ms: u64,
}

/// The linear fetch → extract → row → append pipeline.
pub struct Pipeline<M, S> {
    http: reqwest::Client,
    extractor: ExtractionClient<M>,
    sink: S,
    observer: ObserverHandle,
}

/// The production pipeline: LLM provider + Google Sheets.
pub type LivePipeline = Pipeline<LlmVisionModel, SheetsClient>;

impl<M: VisionModel, S: RowSink> Pipeline<M, S> {
    pub fn new(http: reqwest::Client, model: M, sink: S, config: &PipelineConfig) -> Self {
        Self {
            http,
            extractor: ExtractionClient::new(model, config),
            sink,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Route stage events to `observer`.
    pub fn with_observer(mut self, observer: ObserverHandle) -> Self {
        self.observer = observer;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run one submission end to end.
    ///
    /// The row's first column is the link as submitted, not the rewritten
    /// download URL, so the sheet keeps what the operator actually shared.
    ///
    /// # Errors
    /// Returns the first stage failure as a [`SubmissionError`]; later
    /// stages do not run. In particular nothing is appended unless the
    /// extraction produced a well-formed row.
    pub async fn submit(&self, raw_link: &str) -> Result<SubmissionReport, SubmissionError> {
        let start = Instant::now();
        let raw_link = raw_link.trim();
        self.observer.on_submission_start(raw_link);

        let result = self.run_stages(raw_link, start).await;
        if let Err(ref e) = result {
            warn!("Submission of {} failed at {} stage: {}", raw_link, e.stage(), e);
            self.observer.on_stage_error(e.stage(), e.user_message());
        }
        result
    }

    async fn run_stages(&self, raw_link: &str, start: Instant) -> Result<SubmissionReport, SubmissionError> {
        if raw_link.is_empty() {
            return Err(SubmissionError::EmptyLink);
        }
        info!("Starting submission: {}", raw_link);

        // ── Step 1: Resolve link ─────────────────────────────────────────────
        let resolved = link::direct_download_link(raw_link).ok_or_else(|| FetchError::UnresolvableLink {
            link: raw_link.to_string(),
        })?;
        if resolved != raw_link {
            debug!("Rewrote share link {}", raw_link);
        }
        info!("Resolved link → {}", resolved);
        self.observer.on_link_resolved(raw_link, &resolved);

        // ── Step 2: Fetch image ──────────────────────────────────────────────
        let image = fetch_image(&self.http, &resolved).await?;
        let summary = encode::summarize(&image);
        info!("Fetched {} ({} bytes)", summary.mime_type, summary.byte_len);
        self.observer.on_image_fetched(&resolved, &summary);

        // ── Step 3: Extract ──────────────────────────────────────────────────
        let extraction = self.extractor.extract(image, self.observer.as_ref()).await?;
        info!("Extraction finished after {} attempt(s)", extraction.attempts);
        self.observer.on_extraction_complete(&extraction.text);

        // ── Step 4: Build row ────────────────────────────────────────────────
        info!("Building row");
        let row = build_row(&postprocess::clean_reply(&extraction.text), raw_link)?;
        info!("Row built: {} fields", row.values().len());

        // ── Step 5: Append ───────────────────────────────────────────────────
        info!("Appending row");
        let receipt = self.sink.append_row(&row).await?;
        info!("Row appended at {:?}", receipt.updated_range);
        self.observer.on_row_appended(&row, &receipt);

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!("Submission complete in {}ms", duration_ms);

        Ok(SubmissionReport {
            raw_link: raw_link.to_string(),
            resolved_link: resolved,
            image: summary,
            extraction: extraction.text,
            attempts: extraction.attempts,
            row,
            receipt,
            duration_ms,
        })
    }
}

/// Build the production pipeline from configuration and secrets.
///
/// Fails fast on anything that would make every submission fail: a missing
/// model API key, an unknown provider, an unusable HTTP client.
pub fn connect(config: &PipelineConfig, secrets: &Secrets) -> Result<LivePipeline, Error> {
    let http = http_client()?;
    let provider = resolve_provider(config)?;
    let model = LlmVisionModel::new(provider, config);
    let sink = SheetsClient::new(http.clone(), secrets, config);
    info!(
        "Pipeline ready: {}/{} → spreadsheet {} ({})",
        config.provider_name, config.model, secrets.spreadsheet_id, config.worksheet
    );
    Ok(Pipeline::new(http, model, sink, config))
}

/// The shared HTTP client used for image downloads and Sheets calls.
///
/// No request timeout is set: downloads use the transport defaults.
pub fn http_client() -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .user_agent(concat!("shot2sheet/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::HttpClient(e.to_string()))
}

/// Instantiate the configured vision provider.
///
/// The factory reads the provider's API key from its standard environment
/// variable; [`require_model_key`] checks it is present first so a missing
/// key is reported before the first submission rather than during it.
fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn LLMProvider>, Error> {
    require_model_key(&config.provider_name)?;
    ProviderFactory::create_llm_provider(&config.provider_name, &config.model).map_err(|e| {
        Error::ProviderNotConfigured {
            provider: config.provider_name.clone(),
            hint: format!("{e}"),
        }
    })
}
