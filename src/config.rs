//! Configuration types for screenshot-to-sheet submissions.
//!
//! Non-secret behaviour lives in [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. The three out-of-band secrets (model API key,
//! spreadsheet id, service-account credential) live in [`Secrets`] so they
//! never end up in a `Debug` dump of the pipeline settings.
//!
//! Both are constructed once at process start and shared read-only by every
//! submission.

use crate::error::Error;
use crate::sheets::ServiceAccountKey;
use std::fmt;
use std::time::Duration;

/// Default model provider.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default target worksheet.
pub const DEFAULT_WORKSHEET: &str = "Sheet1";

/// Default Sheets API endpoint.
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

/// Settings for a [`crate::Pipeline`].
///
/// # Example
/// ```rust
/// use shot2sheet::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .model("gemini-2.5-pro")
///     .worksheet("Leads")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_attempts, 5);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// LLM provider name passed to the provider factory. Default: `gemini`.
    pub provider_name: String,

    /// Vision model identifier. Default: `gemini-2.5-flash`.
    pub model: String,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Transcription wants the model to copy what it sees, not improvise.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 256.
    ///
    /// The reply is a single CSV line; anything longer is already wrong.
    pub max_tokens: usize,

    /// Total model calls per submission when rate-limited. Default: 5.
    pub max_attempts: u32,

    /// Fixed wait between rate-limited attempts. Default: 60 s.
    ///
    /// Matches the per-minute quota window of hosted model APIs.
    pub retry_delay: Duration,

    /// Custom extraction prompt. If None, uses the built-in default.
    pub prompt: Option<String>,

    /// Worksheet (tab) the rows are appended to. Default: `Sheet1`.
    pub worksheet: String,

    /// Sheets API base URL. Default: `https://sheets.googleapis.com`.
    pub sheets_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provider_name: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 256,
            max_attempts: 5,
            retry_delay: Duration::from_secs(60),
            prompt: None,
            worksheet: DEFAULT_WORKSHEET.to_string(),
            sheets_base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn worksheet(mut self, name: impl Into<String>) -> Self {
        self.config.worksheet = name.into();
        self
    }

    pub fn sheets_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.sheets_base_url = url.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Error> {
        let c = &self.config;
        if c.max_attempts == 0 {
            return Err(Error::InvalidConfig("max attempts must be ≥ 1".into()));
        }
        if c.model.trim().is_empty() {
            return Err(Error::InvalidConfig("model must not be empty".into()));
        }
        if c.provider_name.trim().is_empty() {
            return Err(Error::InvalidConfig("provider must not be empty".into()));
        }
        if c.worksheet.trim().is_empty() {
            return Err(Error::InvalidConfig("worksheet must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(Error::InvalidConfig("max tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

/// The out-of-band secrets every process needs before it can serve a submission.
#[derive(Clone)]
pub struct Secrets {
    /// Target spreadsheet id (the long token in the sheet URL).
    pub spreadsheet_id: String,

    /// Service-account credential with spreadsheet write access.
    pub service_account: ServiceAccountKey,
}

impl Secrets {
    /// Assemble secrets from a spreadsheet id and a service-account source.
    ///
    /// `service_account` is either the JSON key payload itself or a path to
    /// the JSON key file.
    pub fn new(spreadsheet_id: impl Into<String>, service_account: &str) -> Result<Self, Error> {
        let spreadsheet_id = spreadsheet_id.into();
        if spreadsheet_id.trim().is_empty() {
            return Err(Error::InvalidConfig("spreadsheet id must not be empty".into()));
        }
        let service_account = ServiceAccountKey::load(service_account)?;
        Ok(Self {
            spreadsheet_id: spreadsheet_id.trim().to_string(),
            service_account,
        })
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("service_account", &self.service_account)
            .finish()
    }
}

/// Environment variable holding the API key for a provider, if it is one we know.
pub fn api_key_var(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        "gemini" | "google" => Some("GEMINI_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        _ => None,
    }
}

/// Fail fast when the model API key for `provider` is absent or empty.
///
/// The provider factory reads the key itself; this check only moves the
/// failure from the first submission to startup.
pub fn require_model_key(provider: &str) -> Result<(), Error> {
    let Some(var) = api_key_var(provider) else {
        return Ok(());
    };
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(Error::ProviderNotConfigured {
            provider: provider.to_string(),
            hint: format!("Set {var} before starting."),
        }),
    }
}
