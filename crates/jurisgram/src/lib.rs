//! Content generation gateway for legal-marketing Instagram profiles.
//!
//! `jurisgram` audits an Instagram bio and generates content hooks,
//! short-video scripts, and authority posts for lawyers, on top of the
//! Google Generative Language ("Gemini") API. The core abstraction is the
//! [`ContentGateway`](gateway::ContentGateway), one object composing the
//! three blocks every operation shares:
//!
//! - prompt templates ([`prompt`]) that turn typed inputs into an
//!   instruction with an inline JSON shape directive,
//! - a resilient invoker ([`retry`]) that retries quota/rate-limit
//!   failures with exponential backoff and jitter,
//! - a response decoder ([`decode`]) that recovers a JSON value from
//!   fence-wrapped or prose-wrapped model output.
//!
//! # Getting started
//!
//! ```ignore
//! use jurisgram::gateway::{AuditRequest, ContentGateway};
//! use jurisgram::prompt::Language;
//! use jurisgram::GeminiClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), jurisgram::GatewayError> {
//!     let api_key = std::env::var("GEMINI_API_KEY").unwrap();
//!     let gateway = ContentGateway::new(GeminiClient::new(api_key)?);
//!
//!     let audit = gateway
//!         .audit_bio(&AuditRequest {
//!             niche: Some("Family Law".into()),
//!             handle: Some("dra.silva.adv".into()),
//!             image: None,
//!             language: Language::En,
//!         })
//!         .await?;
//!
//!     let hooks = gateway
//!         .generate_hooks("Family Law", Some(&audit), Language::En)
//!         .await?;
//!     println!("{}", hooks.len());
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Call the four operations:** [`ContentGateway`](gateway::ContentGateway)
//!   with `audit_bio`, `generate_hooks`, `generate_scripts`,
//!   `generate_authority_posts`. Tune models and retry budget via
//!   [`GatewayConfig`](gateway::GatewayConfig).
//! - **Decoded result types:** [`content`]: [`AuditResult`],
//!   [`Hook`], [`ReelScript`], [`AuthorityPost`].
//! - **Error classification:** [`GatewayError`]. Remote failures carry
//!   the provider's message so [`GatewayError::is_quota`] can decide
//!   retryability; decode failures preserve the raw reply text.
//! - **Swap the model backend:** implement [`TextModel`]. The gateway
//!   only ever talks to the model through this trait, so tests script
//!   replies without any HTTP.
//!
//! The gateway holds no shared mutable state: each invocation owns its
//! prompt, its retry sequence, and its decoded result. Credentials are
//! passed into [`GeminiClient::new`] explicitly; the library never reads
//! the process environment.

pub mod content;
pub mod decode;
pub mod error;
pub mod gateway;
pub mod prompt;
pub mod retry;

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub use content::{AuditResult, AuthorityPost, Finding, Hook, ReelScript};
pub use error::GatewayError;
pub use gateway::{AuditRequest, ContentGateway, GatewayConfig};
pub use prompt::Language;
pub use retry::RetryPolicy;

// ── Constants ──────────────────────────────────────────────────────

/// Base URL of the Generative Language REST API.
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for bio audits (strong reasoning, web-search capable).
pub const DEFAULT_AUDIT_MODEL: &str = "gemini-3-pro-preview";

/// Default model for hooks, scripts, and posts (fast, cheap).
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-3-flash-preview";

// ── Request types ──────────────────────────────────────────────────

/// Image bytes paired with their MIME type, for multi-part audit requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// MIME type of the bytes, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Raw image bytes. Base64 encoding happens at the wire boundary.
    pub bytes: Vec<u8>,
}

/// Generation request body. Unused optional fields are omitted from
/// serialization.
#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,
}

impl GenerateRequest {
    /// A plain single-text request.
    pub fn text(instruction: impl Into<String>) -> Self {
        Self::multipart(vec![Part::text(instruction)])
    }

    /// A multi-part request (e.g. image bytes + instruction text).
    pub fn multipart(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content { parts }],
            ..Default::default()
        }
    }

    /// Ask the model for `application/json` output.
    pub fn with_json_output(mut self) -> Self {
        self.generation_config
            .get_or_insert_with(GenerationConfig::default)
            .response_mime_type = Some("application/json".to_string());
        self
    }

    /// Attach the provider-side web-search tool.
    pub fn with_web_search(mut self) -> Self {
        self.tools.get_or_insert_with(Vec::new).push(ToolDef::web_search());
        self
    }
}

/// One turn of request content.
#[derive(Serialize, Debug)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// A single content part: text or inline binary data.
#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// An inline-data part from raw image bytes.
    pub fn inline_image(image: &ImageData) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: BASE64.encode(&image.bytes),
            }),
            ..Default::default()
        }
    }
}

/// Inline binary payload, base64-encoded on the wire.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Generation parameters. Only the fields this crate uses are modeled.
#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A provider-side tool attached to a request.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ToolDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<GoogleSearch>,
}

impl ToolDef {
    /// The web-search tool, serialized as `{"googleSearch": {}}`.
    pub fn web_search() -> Self {
        Self {
            google_search: Some(GoogleSearch {}),
        }
    }
}

/// Marker config for the provider's web-search tool.
#[derive(Serialize, Debug, Default)]
pub struct GoogleSearch {}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawGenerateResponse {
    candidates: Option<Vec<RawCandidate>>,
    prompt_feedback: Option<RawPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawCandidate {
    content: Option<RawContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawContent {
    parts: Option<Vec<RawPart>>,
}

#[derive(Deserialize, Debug)]
struct RawPart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawPromptFeedback {
    block_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
    pub total_token_count: Option<u32>,
}

/// Clean return type from a model call: the concatenated candidate text.
#[derive(Debug)]
pub struct GenerateReply {
    pub text: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<UsageMetadata>,
}

// ── Model seam ─────────────────────────────────────────────────────

/// Boxed future returned by [`TextModel::generate`], so the trait stays
/// dyn-compatible.
pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<GenerateReply, GatewayError>> + Send + 'a>>;

/// A remote text-generation model.
///
/// The gateway talks to the backend exclusively through this trait. The
/// production implementor is [`GeminiClient`]; tests substitute scripted
/// fakes.
pub trait TextModel: Send + Sync {
    /// Send a single generation request to the named model.
    fn generate<'a>(&'a self, model: &'a str, request: GenerateRequest) -> GenerateFuture<'a>;
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the Generative Language API.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client with the given API key.
    ///
    /// The key is supplied by the caller; this crate never reads it from
    /// the process environment.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GatewayError> {
        Self::with_base_url(api_key, GEMINI_API_URL)
    }

    /// Create a client against a custom endpoint (staging, proxy).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .user_agent("jurisgram/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| GatewayError::Remote(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    /// Send a generation request and flatten the response into a
    /// [`GenerateReply`].
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateReply, GatewayError> {
        let part_count = request.contents.iter().map(|c| c.parts.len()).sum::<usize>();
        debug!(
            "model request: model={}, parts={}, json_output={}, tools={}",
            model,
            part_count,
            request
                .generation_config
                .as_ref()
                .is_some_and(|c| c.response_mime_type.is_some()),
            request.tools.as_ref().map_or(0, |t| t.len()),
        );
        trace!(
            "request payload size: {} bytes",
            serde_json::to_string(request).map_or(0, |s| s.len())
        );

        let start = Instant::now();
        let url = format!("{}/models/{model}:generateContent", self.base_url);

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Remote(format!("request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Remote(format!("failed to read response: {e}")))?;

        debug!(
            "model response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            body.len()
        );

        if !status.is_success() {
            return Err(GatewayError::Remote(format!(
                "Gemini API HTTP {status}: {body}"
            )));
        }

        let parsed: RawGenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Remote(format!("failed to parse response envelope: {e}")))?;

        reply_from_raw(parsed)
    }
}

impl TextModel for GeminiClient {
    fn generate<'a>(&'a self, model: &'a str, request: GenerateRequest) -> GenerateFuture<'a> {
        Box::pin(async move { self.generate_content(model, &request).await })
    }
}

/// Flatten a raw API response into a [`GenerateReply`].
///
/// A prompt blocked by safety filters has no candidates and carries a
/// block reason instead; that surfaces as a remote error.
fn reply_from_raw(parsed: RawGenerateResponse) -> Result<GenerateReply, GatewayError> {
    if let Some(feedback) = parsed.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            return Err(GatewayError::Remote(format!(
                "prompt blocked by safety filters: {reason}"
            )));
        }
    }

    if let Some(ref usage) = parsed.usage_metadata {
        debug!(
            "token usage: prompt={}, candidates={}, total={}",
            usage.prompt_token_count.unwrap_or(0),
            usage.candidates_token_count.unwrap_or(0),
            usage.total_token_count.unwrap_or(0),
        );
    }

    let candidate = parsed.candidates.and_then(|c| c.into_iter().next());

    match candidate {
        Some(c) => {
            let text: String = c
                .content
                .and_then(|content| content.parts)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|p| p.text)
                .collect();
            debug!(
                "model output: {} chars text, finish_reason={:?}",
                text.len(),
                c.finish_reason
            );
            Ok(GenerateReply {
                text: if text.is_empty() { None } else { Some(text) },
                finish_reason: c.finish_reason,
                usage: parsed.usage_metadata,
            })
        }
        None => {
            debug!("model output: empty (no candidates)");
            Ok(GenerateReply {
                text: None,
                finish_reason: None,
                usage: parsed.usage_metadata,
            })
        }
    }
}
