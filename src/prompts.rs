//! Prompts for VLM-based contact extraction.
//!
//! Callers can override the default via [`crate::config::PipelineConfig::prompt`];
//! the constant here is used only when no override is provided.

/// Default instruction sent alongside every screenshot.
///
/// The reply contract is one unheaded CSV line with four values in the fixed
/// order name, phone, center, source. [`crate::pipeline::row`] relies on it.
pub const EXTRACTION_PROMPT: &str = r#"This is a screenshot of a chat or message from a social media or messaging platform.
Please extract the following details from the image:
Client Name, Mobile No., Center, Source.

- "Source" should be the platform/app detected from the screenshot (e.g. WhatsApp, Telegram, Twitter, Instagram, Facebook, etc).
- Return ONLY a single CSV row (no header), values in this order, comma separated.
- Do NOT add commentary, explanations, or code fences.
Example:
Karan Patel,+918954687354,Jagatpura,WhatsApp"#;
