//! Error types for the shot2sheet library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Error`]: **Fatal**: the process cannot serve any submission at all
//!   (provider not configured, unreadable service-account key, invalid
//!   configuration). Returned from startup-time constructors.
//!
//! * [`SubmissionError`]: **Non-fatal**: one submission failed at one
//!   stage. The operator may simply paste the next link; nothing about the
//!   failure carries over to later submissions.
//!
//! Each pipeline stage owns its own error enum ([`FetchError`],
//! [`ExtractError`], [`RowError`], [`SheetError`]) and converts every
//! failure it can observe into it, so no panic or untyped error escapes a
//! stage.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// All fatal errors returned by the shot2sheet library.
#[derive(Debug, Error)]
pub enum Error {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured model provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The service-account credential could not be read or parsed.
    #[error("Invalid service-account credential: {0}")]
    InvalidCredential(String),

    /// The shared HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Which stage of a submission an event or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolve,
    Fetch,
    Extract,
    Row,
    Append,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Resolve => "resolve",
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Row => "row",
            Stage::Append => "append",
        };
        f.write_str(name)
    }
}

/// A failed submission. The variant tells the operator which stage halted it.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The pasted link was empty after trimming.
    #[error("No link provided.")]
    EmptyLink,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Row(#[from] RowError),

    #[error(transparent)]
    Sheet(#[from] SheetError),
}

impl SubmissionError {
    /// The stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            SubmissionError::EmptyLink => Stage::Resolve,
            SubmissionError::Fetch(FetchError::UnresolvableLink { .. }) => Stage::Resolve,
            SubmissionError::Fetch(_) => Stage::Fetch,
            SubmissionError::Extract(_) => Stage::Extract,
            SubmissionError::Row(_) => Stage::Row,
            SubmissionError::Sheet(_) => Stage::Append,
        }
    }

    /// The message shown to the operator.
    ///
    /// Fetch failures collapse to one generic line; the precise cause stays
    /// in the logs. Every other stage surfaces its own message.
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::Fetch(_) => FetchError::USER_MESSAGE.to_string(),
            SubmissionError::Sheet(e) => format!("Sheet Error: {e}"),
            other => other.to_string(),
        }
    }
}

/// The image could not be obtained from the link.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// A cloud-storage share link carried no recognisable file id.
    #[error("No file id found in share link '{link}'")]
    UnresolvableLink { link: String },

    /// The request never produced a response (DNS, TLS, connection reset…).
    #[error("Failed to download '{url}': {reason}")]
    Transport { url: String, reason: String },

    /// The server answered with something other than 200 OK.
    #[error("Failed to download '{url}': HTTP {status}")]
    Status { url: String, status: u16 },

    /// 200 OK, but the server did not label the body as an image.
    #[error("'{url}' is not an image (content-type: {content_type:?})")]
    NotAnImage { url: String, content_type: String },
}

impl FetchError {
    pub const USER_MESSAGE: &'static str = "Could not fetch a valid image from the link.";
}

/// A single model call failed.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Rate limit / quota exhaustion. The only retryable kind.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Anything else the provider reported.
    #[error("{0}")]
    Api(String),
}

impl ModelError {
    /// Classify a provider error message.
    ///
    /// Used for provider errors that arrive as free text. Providers surface
    /// quota exhaustion as HTTP 429, gRPC `RESOURCE_EXHAUSTED`, or a "rate
    /// limit"/"quota exceeded" phrase depending on the backend; all of them
    /// map to [`ModelError::RateLimited`].
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_quota_message(&message) {
            ModelError::RateLimited(message)
        } else {
            ModelError::Api(message)
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ModelError::RateLimited(_))
    }
}

/// Status codes and phrases providers use for quota exhaustion. Anchored on
/// word boundaries so numbers such as a byte count of `14290` don't match.
static RE_QUOTA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b429\b|\bresource[_ ]exhausted\b|\btoo many requests\b|\brate[ _-]?limit|\bquota (?:exceeded|exhausted)\b|\bexceeded (?:your )?(?:current )?quota\b",
    )
    .unwrap()
});

fn is_quota_message(message: &str) -> bool {
    RE_QUOTA.is_match(message)
}

/// The extraction stage gave up.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// Every attempt hit a rate limit.
    #[error("Model quota exhausted.")]
    QuotaExhausted { attempts: u32 },

    /// A non-retryable model failure.
    #[error("Model call failed: {0}")]
    Model(String),
}

/// The model reply did not split into the expected row shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("Unexpected output format: expected 5 fields, got {fields}.")]
    UnexpectedFormat { fields: usize },
}

/// The spreadsheet service rejected or never received the append.
#[derive(Debug, Clone, Error)]
pub enum SheetError {
    /// The service-account key could not sign an assertion.
    #[error("Could not sign service-account assertion: {0}")]
    Signing(String),

    /// The OAuth2 token endpoint refused the assertion.
    #[error("Token exchange failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// The Sheets API returned an error response.
    #[error("Sheets API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a usable response.
    #[error("Sheets request failed: {0}")]
    Transport(String),
}
