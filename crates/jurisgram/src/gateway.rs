//! The generation gateway: prompt → retried model call → decode → typed
//! result.
//!
//! Four operations share the same pipeline. Each builds an
//! operation-specific instruction, performs the remote call with
//! quota-aware retry, recovers a JSON value from the free-form reply, and
//! deserializes it into the typed result. A shape mismatch after a
//! successful JSON recovery is still a decode failure: the raw reply is
//! preserved on the error, never replaced with a guess.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::info;

use crate::content::{AuditResult, AuthorityPost, Hook, ReelScript};
use crate::decode::extract_json_or;
use crate::error::GatewayError;
use crate::prompt::{self, Language};
use crate::retry::{RetryPolicy, invoke_with_retry};
use crate::{
    DEFAULT_AUDIT_MODEL, DEFAULT_GENERATION_MODEL, GenerateRequest, ImageData, Part, TextModel,
};

// ── Configuration ──────────────────────────────────────────────────

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Model for bio audits. Default: [`DEFAULT_AUDIT_MODEL`].
    pub audit_model: String,
    /// Model for hooks, scripts, and posts. Default:
    /// [`DEFAULT_GENERATION_MODEL`].
    pub generation_model: String,
    /// Retry policy applied to quota failures on every operation.
    pub retry: RetryPolicy,
    /// Attach the provider's web-search tool to audit requests so the
    /// model can look the profile up.
    pub web_search: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            audit_model: DEFAULT_AUDIT_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            retry: RetryPolicy::default(),
            web_search: true,
        }
    }
}

/// Inputs for a bio audit.
///
/// The caller guarantees at least one of `handle` or `image` is present;
/// the gateway does not re-validate.
#[derive(Debug, Clone, Default)]
pub struct AuditRequest {
    /// Specialization niche. When absent, the model infers one.
    pub niche: Option<String>,
    /// Instagram handle, without the leading `@`.
    pub handle: Option<String>,
    /// Profile screenshot for multi-part analysis.
    pub image: Option<ImageData>,
    pub language: Language,
}

// ── Gateway ────────────────────────────────────────────────────────

/// Generation gateway over a text model.
///
/// Invocations share no mutable state: each call owns its prompt, its
/// retry sequence, and its decoded result, so concurrent calls never
/// interfere. The only suspension point is the backoff sleep inside the
/// retry loop.
pub struct ContentGateway<M> {
    model: M,
    config: GatewayConfig,
}

impl<M: TextModel> ContentGateway<M> {
    /// Create a gateway with the default configuration.
    pub fn new(model: M) -> Self {
        Self::with_config(model, GatewayConfig::default())
    }

    /// Create a gateway with a custom configuration.
    pub fn with_config(model: M, config: GatewayConfig) -> Self {
        Self { model, config }
    }

    /// Audit an Instagram bio.
    ///
    /// Returns the five findings (name plus four bio lines) and general
    /// recommendations. A reply missing any finding fails as
    /// [`GatewayError::MalformedResponse`].
    pub async fn audit_bio(&self, request: &AuditRequest) -> Result<AuditResult, GatewayError> {
        let instruction = prompt::audit_prompt(
            request.niche.as_deref(),
            request.handle.as_deref(),
            request.language,
        );

        let reply = invoke_with_retry(&self.config.retry, || {
            let body = self.audit_request_body(&instruction, request.image.as_ref());
            self.model.generate(&self.config.audit_model, body)
        })
        .await?;

        let raw = reply.text.unwrap_or_default();
        let value = extract_json_or(&raw, json!({}))?;
        let audit: AuditResult = typed(value, &raw)?;
        info!(
            recommendations = audit.recommendations.len(),
            "bio audit complete"
        );
        Ok(audit)
    }

    /// Generate content hooks for a niche. Targets
    /// [`prompt::HOOKS_PER_CALL`] hooks per call; an empty reply is a
    /// valid empty batch.
    pub async fn generate_hooks(
        &self,
        niche: &str,
        prior: Option<&AuditResult>,
        language: Language,
    ) -> Result<Vec<Hook>, GatewayError> {
        let instruction = prompt::hooks_prompt(niche, prior, language);
        let hooks: Vec<Hook> = self.generate_list(&instruction).await?;
        info!(niche, count = hooks.len(), "hooks generated");
        Ok(hooks)
    }

    /// Generate short-video scripts for a niche. Targets
    /// [`prompt::SCRIPTS_PER_CALL`] scripts per call.
    pub async fn generate_scripts(
        &self,
        niche: &str,
        prior: Option<&AuditResult>,
        language: Language,
    ) -> Result<Vec<ReelScript>, GatewayError> {
        let instruction = prompt::scripts_prompt(niche, prior, language);
        let scripts: Vec<ReelScript> = self.generate_list(&instruction).await?;
        info!(niche, count = scripts.len(), "scripts generated");
        Ok(scripts)
    }

    /// Generate authority posts for a niche. Targets
    /// [`prompt::POSTS_PER_CALL`] posts per call.
    pub async fn generate_authority_posts(
        &self,
        niche: &str,
        prior: Option<&AuditResult>,
        language: Language,
    ) -> Result<Vec<AuthorityPost>, GatewayError> {
        let instruction = prompt::authority_posts_prompt(niche, prior, language);
        let posts: Vec<AuthorityPost> = self.generate_list(&instruction).await?;
        info!(niche, count = posts.len(), "authority posts generated");
        Ok(posts)
    }

    /// Shared pipeline for the list-producing operations.
    async fn generate_list<T: DeserializeOwned>(
        &self,
        instruction: &str,
    ) -> Result<Vec<T>, GatewayError> {
        let reply = invoke_with_retry(&self.config.retry, || {
            let body = GenerateRequest::text(instruction).with_json_output();
            self.model.generate(&self.config.generation_model, body)
        })
        .await?;

        let raw = reply.text.unwrap_or_default();
        let value = extract_json_or(&raw, json!([]))?;
        typed(value, &raw)
    }

    /// Request body for the audit: optional image part, then the
    /// instruction, JSON output, and the web-search tool per config.
    fn audit_request_body(&self, instruction: &str, image: Option<&ImageData>) -> GenerateRequest {
        let mut parts = Vec::new();
        if let Some(image) = image {
            parts.push(Part::inline_image(image));
        }
        parts.push(Part::text(instruction));

        let mut body = GenerateRequest::multipart(parts).with_json_output();
        if self.config.web_search {
            body = body.with_web_search();
        }
        body
    }
}

/// Deserialize a recovered JSON value into the operation's result type.
/// A mismatch is a decode failure carrying the raw reply.
fn typed<T: DeserializeOwned>(value: Value, raw: &str) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|e| GatewayError::MalformedResponse {
        detail: format!("shape mismatch: {e}"),
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GenerateReply;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// A scripted model: pops one canned reply per call and records every
    /// request it receives.
    #[derive(Default)]
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, GatewayError>>>,
        requests: Mutex<Vec<(String, GenerateRequest)>>,
    }

    impl ScriptedModel {
        fn with_replies(replies: Vec<Result<&str, GatewayError>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request_text(&self, index: usize) -> String {
            let requests = self.requests.lock().unwrap();
            requests[index]
                .1
                .contents
                .iter()
                .flat_map(|c| c.parts.iter())
                .filter_map(|p| p.text.clone())
                .collect()
        }
    }

    impl TextModel for ScriptedModel {
        fn generate<'a>(
            &'a self,
            model: &'a str,
            request: GenerateRequest,
        ) -> crate::GenerateFuture<'a> {
            self.requests
                .lock()
                .unwrap()
                .push((model.to_string(), request));
            let result = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::Remote("script exhausted".into())));
            Box::pin(async move {
                result.map(|text| GenerateReply {
                    text: Some(text),
                    finish_reason: None,
                    usage: None,
                })
            })
        }
    }

    /// Config with microsecond retry delays so tests stay fast.
    fn fast_config() -> GatewayConfig {
        GatewayConfig {
            retry: RetryPolicy {
                max_retries: 5,
                initial_delay: Duration::from_micros(10),
                multiplier: 2.0,
                max_jitter: Duration::ZERO,
            },
            ..GatewayConfig::default()
        }
    }

    fn audit_reply() -> &'static str {
        r#"{
            "name": {"status":"weak","analysis":"no keywords","suggestion":"Dr. Silva | Family Law"},
            "line1": {"status":"ok","analysis":"","suggestion":"Custody & divorce specialist"},
            "line2": {"status":"ok","analysis":"","suggestion":"10 years, 500+ families helped"},
            "line3": {"status":"missing","analysis":"","suggestion":"Featured in Folha"},
            "line4": {"status":"weak","analysis":"","suggestion":"DM \"HELP\" for a consult"},
            "recommendations": ["Post 3x per week"]
        }"#
    }

    #[tokio::test]
    async fn hooks_end_to_end_from_fenced_reply() {
        let model = ScriptedModel::with_replies(vec![Ok(
            "```json\n[{\"text\":\"Stop losing custody battles\",\"category\":\"pain\"}]\n```",
        )]);
        let gateway = ContentGateway::with_config(model, fast_config());

        let hooks = gateway
            .generate_hooks("Family Law", None, Language::En)
            .await
            .unwrap();

        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].text, "Stop losing custody battles");
        assert_eq!(hooks[0].category, "pain");

        // One attempt, against the generation model, with the niche and
        // target count in the instruction.
        assert_eq!(gateway.model.call_count(), 1);
        let instruction = gateway.model.request_text(0);
        assert!(instruction.contains("Family Law"));
        assert!(instruction.contains("30"));
        let requests = gateway.model.requests.lock().unwrap();
        assert_eq!(requests[0].0, DEFAULT_GENERATION_MODEL);
    }

    #[tokio::test]
    async fn quota_failures_retried_then_success() {
        let model = ScriptedModel::with_replies(vec![
            Err(GatewayError::Remote("429 Too Many Requests".into())),
            Err(GatewayError::Remote(
                "Gemini API HTTP 429: RESOURCE_EXHAUSTED".into(),
            )),
            Ok("[]"),
        ]);
        let gateway = ContentGateway::with_config(model, fast_config());

        let hooks = gateway
            .generate_hooks("Family Law", None, Language::Pt)
            .await
            .unwrap();

        assert!(hooks.is_empty());
        assert_eq!(gateway.model.call_count(), 3, "exactly three attempts");
    }

    #[tokio::test]
    async fn non_retryable_error_propagates_immediately() {
        let model = ScriptedModel::with_replies(vec![Err(GatewayError::Remote(
            "Gemini API HTTP 401: unauthorized".into(),
        ))]);
        let gateway = ContentGateway::with_config(model, fast_config());

        let err = gateway
            .generate_scripts("Family Law", None, Language::En)
            .await
            .unwrap_err();

        assert!(!err.is_quota());
        assert_eq!(gateway.model.call_count(), 1);
    }

    #[tokio::test]
    async fn quota_error_surfaces_unchanged_after_budget() {
        let mut config = fast_config();
        config.retry.max_retries = 2;
        let model = ScriptedModel::with_replies(vec![
            Err(GatewayError::Remote("429 first".into())),
            Err(GatewayError::Remote("429 second".into())),
            Err(GatewayError::Remote("429 last".into())),
        ]);
        let gateway = ContentGateway::with_config(model, config);

        let err = gateway
            .generate_hooks("Tax Law", None, Language::En)
            .await
            .unwrap_err();

        assert_eq!(gateway.model.call_count(), 3);
        assert!(err.to_string().contains("429 last"));
    }

    #[tokio::test]
    async fn audit_parses_full_result() {
        let model = ScriptedModel::with_replies(vec![Ok(audit_reply())]);
        let gateway = ContentGateway::with_config(model, fast_config());

        let audit = gateway
            .audit_bio(&AuditRequest {
                niche: Some("Family Law".into()),
                handle: Some("dra.silva.adv".into()),
                image: None,
                language: Language::En,
            })
            .await
            .unwrap();

        assert_eq!(audit.name.suggestion, "Dr. Silva | Family Law");
        assert_eq!(audit.recommendations, vec!["Post 3x per week"]);

        let requests = gateway.model.requests.lock().unwrap();
        let (model_id, request) = &requests[0];
        assert_eq!(model_id, DEFAULT_AUDIT_MODEL);
        // Web search attached by default, single text part without image.
        assert!(request.tools.is_some());
        assert_eq!(request.contents[0].parts.len(), 1);
    }

    #[tokio::test]
    async fn audit_with_image_sends_multipart_body() {
        let model = ScriptedModel::with_replies(vec![Ok(audit_reply())]);
        let gateway = ContentGateway::with_config(model, fast_config());

        gateway
            .audit_bio(&AuditRequest {
                niche: None,
                handle: None,
                image: Some(ImageData {
                    mime_type: "image/png".into(),
                    bytes: vec![1, 2, 3],
                }),
                language: Language::Pt,
            })
            .await
            .unwrap();

        let requests = gateway.model.requests.lock().unwrap();
        let parts = &requests[0].1.contents[0].parts;
        assert_eq!(parts.len(), 2);
        assert!(parts[0].inline_data.is_some(), "image first");
        assert!(parts[1].text.is_some(), "instruction second");
    }

    #[tokio::test]
    async fn audit_missing_findings_is_malformed_with_raw_kept() {
        let raw = r#"{"name": {"status":"ok","analysis":"","suggestion":"x"}}"#;
        let model = ScriptedModel::with_replies(vec![Ok(raw)]);
        let gateway = ContentGateway::with_config(model, fast_config());

        let err = gateway
            .audit_bio(&AuditRequest {
                handle: Some("x".into()),
                ..AuditRequest::default()
            })
            .await
            .unwrap_err();

        match err {
            GatewayError::MalformedResponse { raw: kept, .. } => assert_eq!(kept, raw),
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn audit_empty_reply_is_malformed() {
        let model = ScriptedModel::with_replies(vec![Ok("")]);
        let gateway = ContentGateway::with_config(model, fast_config());

        let err = gateway
            .audit_bio(&AuditRequest {
                handle: Some("x".into()),
                ..AuditRequest::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn empty_reply_is_an_empty_batch_for_list_operations() {
        let model = ScriptedModel::with_replies(vec![Ok("")]);
        let gateway = ContentGateway::with_config(model, fast_config());

        let posts = gateway
            .generate_authority_posts("Family Law", None, Language::En)
            .await
            .unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn prose_reply_with_no_json_is_malformed() {
        let model =
            ScriptedModel::with_replies(vec![Ok("I cannot generate marketing content.")]);
        let gateway = ContentGateway::with_config(model, fast_config());

        let err = gateway
            .generate_hooks("Family Law", None, Language::En)
            .await
            .unwrap_err();

        match err {
            GatewayError::MalformedResponse { raw, .. } => {
                assert_eq!(raw, "I cannot generate marketing content.");
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn prior_audit_context_reaches_the_instruction() {
        let model = ScriptedModel::with_replies(vec![Ok("[]")]);
        let gateway = ContentGateway::with_config(model, fast_config());

        let audit: AuditResult = serde_json::from_str(audit_reply()).unwrap();
        gateway
            .generate_scripts("Family Law", Some(&audit), Language::En)
            .await
            .unwrap();

        let instruction = gateway.model.request_text(0);
        assert!(instruction.contains("Custody & divorce specialist"));
        assert!(instruction.contains("previous bio audit"));
    }

    #[tokio::test]
    async fn scripts_decode_camel_case_fields() {
        let model = ScriptedModel::with_replies(vec![Ok(
            r#"[{"title":"t","overview":"o","hook":"h","mainContent":"m","cta":"c"}]"#,
        )]);
        let gateway = ContentGateway::with_config(model, fast_config());

        let scripts = gateway
            .generate_scripts("Family Law", None, Language::En)
            .await
            .unwrap();
        assert_eq!(scripts[0].main_content, "m");
    }
}
