//! VLM interaction: send the screenshot plus the extraction prompt, retry on quota.
//!
//! The model call sits behind the [`VisionModel`] trait so the retry loop and
//! the pipeline can be exercised with a scripted model. [`LlmVisionModel`] is
//! the production implementation over an `edgequake_llm` provider.
//!
//! ## Retry Strategy
//!
//! Only rate-limit / quota errors are retried, with a fixed delay (60 s by
//! default) between attempts and 5 attempts in total; worst-case latency is
//! therefore bounded at about four minutes of waiting. Any other failure
//! ends the submission on the first attempt.

use crate::config::PipelineConfig;
use crate::error::{ExtractError, ModelError};
use crate::observer::SubmissionObserver;
use crate::pipeline::encode::encode_image;
use crate::pipeline::fetch::FetchedImage;
use crate::prompts::EXTRACTION_PROMPT;
use crate::retry::{RetryError, RetryPolicy};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, LlmError};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A hosted multimodal model that answers one prompt about one image.
pub trait VisionModel: Send + Sync {
    /// Send `prompt` with `image` and return the model's text reply.
    fn complete(
        &self,
        prompt: &str,
        image: &ImageData,
    ) -> impl Future<Output = Result<String, ModelError>> + Send;
}

/// [`VisionModel`] backed by an `edgequake_llm` provider.
pub struct LlmVisionModel {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmVisionModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &PipelineConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

impl VisionModel for LlmVisionModel {
    /// ## Message Layout
    ///
    /// A single user message carrying the prompt text and the screenshot as
    /// an image attachment. No system message: the instruction is about
    /// this one image, and some providers weigh system text differently.
    async fn complete(&self, prompt: &str, image: &ImageData) -> Result<String, ModelError> {
        let messages = vec![ChatMessage::user_with_images(prompt, vec![image.clone()])];
        let options = build_options(self.temperature, self.max_tokens);

        let start = Instant::now();
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(classify_llm_error)?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

/// Map a provider error onto the retryable / non-retryable split.
///
/// A typed rate-limit error is trusted as is. Only the catch-all variants,
/// where a provider passes its HTTP error through as text, are inspected
/// for a quota status; every other variant is a plain failure.
fn classify_llm_error(error: LlmError) -> ModelError {
    match error {
        LlmError::RateLimited(msg) => ModelError::RateLimited(msg),
        e @ (LlmError::ApiError(_) | LlmError::ProviderError(_) | LlmError::Unknown(_)) => {
            ModelError::classify(e.to_string())
        }
        other => ModelError::Api(other.to_string()),
    }
}

/// Build `CompletionOptions` from the pipeline settings.
fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

/// A successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Model reply with surrounding whitespace trimmed; otherwise untouched.
    pub text: String,
    /// Model calls used, including the successful one.
    pub attempts: u32,
}

/// The extraction stage: prompt + image in, trimmed reply out.
pub struct ExtractionClient<M> {
    model: M,
    prompt: String,
    policy: RetryPolicy,
}

impl<M: VisionModel> ExtractionClient<M> {
    pub fn new(model: M, config: &PipelineConfig) -> Self {
        Self {
            model,
            prompt: config
                .prompt
                .clone()
                .unwrap_or_else(|| EXTRACTION_PROMPT.to_string()),
            policy: RetryPolicy::fixed(config.max_attempts, config.retry_delay),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run the model over `image` under the quota retry policy.
    ///
    /// Consumes the image: the bytes are dropped once encoded for the
    /// request.
    pub async fn extract(
        &self,
        image: FetchedImage,
        observer: &dyn SubmissionObserver,
    ) -> Result<Extraction, ExtractError> {
        let payload = encode_image(&image);
        drop(image);

        let max = self.policy.max_attempts.max(1);
        let wait_secs = self.policy.delay.as_secs();

        let outcome = self
            .policy
            .run(
                |attempt| {
                    let payload = &payload;
                    async move {
                        info!("Model call attempt {}/{}", attempt, max);
                        let result = self.model.complete(&self.prompt, payload).await;
                        if let Err(e) = &result {
                            warn!("Model attempt {} failed: {}", attempt, e);
                            if e.is_rate_limited() && attempt < max {
                                observer.on_rate_limited(attempt, max, wait_secs);
                            }
                        }
                        result
                    }
                },
                ModelError::is_rate_limited,
            )
            .await;

        match outcome {
            Ok((text, attempts)) => Ok(Extraction {
                text: text.trim().to_string(),
                attempts,
            }),
            Err(RetryError::Exhausted { attempts, .. }) => {
                Err(ExtractError::QuotaExhausted { attempts })
            }
            Err(RetryError::Aborted { error, .. }) => Err(ExtractError::Model(error.to_string())),
        }
    }
}
