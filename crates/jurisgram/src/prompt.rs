//! Instruction templates for the four gateway operations.
//!
//! Prompts are assembled with [`PromptBuilder`] from typed inputs. Each
//! template embeds the exact JSON shape it expects inline, since the model
//! is not guaranteed to honor a schema side channel uniformly; typed
//! deserialization enforces the shape on the way back.

use std::str::FromStr;

use crate::content::AuditResult;

/// Hooks generated per call.
pub const HOOKS_PER_CALL: usize = 30;
/// Short-video scripts generated per call.
pub const SCRIPTS_PER_CALL: usize = 10;
/// Authority posts generated per call.
pub const POSTS_PER_CALL: usize = 10;

// ── Language ───────────────────────────────────────────────────────

/// Output language for generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    /// Brazilian Portuguese.
    #[default]
    Pt,
    /// English.
    En,
}

impl Language {
    /// The output-language directive appended to every instruction.
    pub fn directive(self) -> &'static str {
        match self {
            Language::Pt => "A resposta DEVE ser em Português do Brasil.",
            Language::En => "The response MUST be in English.",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pt" => Ok(Language::Pt),
            "en" => Ok(Language::En),
            other => Err(format!("unsupported language: {other} (expected pt or en)")),
        }
    }
}

// ── Builder ────────────────────────────────────────────────────────

/// Builder for multi-section instruction prompts.
///
/// Sections are joined with blank lines; empty and `None` sections are
/// silently skipped.
///
/// # Example
///
/// ```
/// use jurisgram::prompt::PromptBuilder;
///
/// let prompt = PromptBuilder::new("You are an expert.")
///     .section("Analyze the profile.")
///     .section_opt(None::<String>)
///     .section_if(true, || "Respond in English.".into())
///     .build();
///
/// assert_eq!(
///     prompt,
///     "You are an expert.\n\nAnalyze the profile.\n\nRespond in English."
/// );
/// ```
pub struct PromptBuilder {
    sections: Vec<String>,
}

impl PromptBuilder {
    /// Create a builder with an initial preamble section.
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            sections: vec![preamble.into()],
        }
    }

    /// Append a section. Skipped if `content` is empty.
    pub fn section(mut self, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(content);
        }
        self
    }

    /// Append a section only when `condition` holds.
    pub fn section_if(self, condition: bool, content_fn: impl FnOnce() -> String) -> Self {
        if condition {
            self.section(content_fn())
        } else {
            self
        }
    }

    /// Append a section only if the content is `Some`.
    pub fn section_opt(self, content: Option<impl Into<String>>) -> Self {
        match content {
            Some(c) => self.section(c),
            None => self,
        }
    }

    /// Join all sections with blank lines.
    pub fn build(self) -> String {
        self.sections.join("\n\n")
    }
}

// ── Shape directives ───────────────────────────────────────────────

const AUDIT_SHAPE: &str = r#"Return EXCLUSIVELY a JSON object:
{
  "name": { "status": "string", "analysis": "string", "suggestion": "string" },
  "line1": { "status": "string", "analysis": "string", "suggestion": "string" },
  "line2": { "status": "string", "analysis": "string", "suggestion": "string" },
  "line3": { "status": "string", "analysis": "string", "suggestion": "string" },
  "line4": { "status": "string", "analysis": "string", "suggestion": "string" },
  "recommendations": ["string"]
}"#;

const HOOKS_SHAPE: &str = r#"Return EXCLUSIVELY a JSON array of objects:
[{ "text": "the hook", "category": "pain|desire|curiosity" }]"#;

const SCRIPTS_SHAPE: &str = r#"Return EXCLUSIVELY a JSON array of objects:
[{ "title": "...", "overview": "...", "hook": "...", "mainContent": "...", "cta": "..." }]"#;

const POSTS_SHAPE: &str = r#"Return EXCLUSIVELY a JSON array of objects:
[{ "title": "...", "content": "...", "objective": "..." }]"#;

// ── Templates ──────────────────────────────────────────────────────

/// Instruction for the bio audit.
///
/// The profile is referenced by `handle` when given, otherwise by the
/// attached image. When `niche` is absent the model is asked to infer the
/// specialization from the profile itself; a missing niche is never a
/// failure at this layer.
pub fn audit_prompt(niche: Option<&str>, handle: Option<&str>, language: Language) -> String {
    let profile_ref = match handle {
        Some(h) => format!("the Instagram profile @{h}"),
        None => "the Instagram profile shown in the attached image".to_string(),
    };
    let niche_line = match niche {
        Some(n) => format!("The lawyer is specialized in {n}."),
        None => "Identify the lawyer's specialization niche from the available profile information."
            .to_string(),
    };

    PromptBuilder::new("You are the world's leading Instagram expert for the legal niche.")
        .section(format!("Your task is to analyze {profile_ref}."))
        .section(
            "Instructions:\n\
             1. ANALYZE the current state: what is working, what is missing, whether the niche is clear.\n\
             2. PROVIDE feedback: a diagnostic of the current name and bio lines.\n\
             3. OPTIMIZE: suggest the best possible version to maximize client conversion.",
        )
        .section(
            "Character limits:\n\
             - Name: max 64 characters (keywords for SEO).\n\
             - Bio: max 150 characters, split into 4 lines.",
        )
        .section(niche_line)
        .section(language.directive())
        .section(AUDIT_SHAPE)
        .build()
}

/// Instruction for hook generation.
pub fn hooks_prompt(niche: &str, prior: Option<&AuditResult>, language: Language) -> String {
    PromptBuilder::new("Act as a content-marketing expert for lawyers.")
        .section(format!(
            "Generate a list of {HOOKS_PER_CALL} high-conversion Instagram hooks for {niche}. \
             Cover pain, desire, and curiosity angles."
        ))
        .section_opt(prior.map(audit_context_block))
        .section(language.directive())
        .section(HOOKS_SHAPE)
        .build()
}

/// Instruction for short-video script generation.
pub fn scripts_prompt(niche: &str, prior: Option<&AuditResult>, language: Language) -> String {
    PromptBuilder::new("Act as a content-marketing expert for lawyers.")
        .section(format!(
            "Create {SCRIPTS_PER_CALL} highly engaging short-video (Reels) scripts for {niche}. \
             Each script needs a strong hook in the first seconds and a clear call to action."
        ))
        .section_opt(prior.map(audit_context_block))
        .section(language.directive())
        .section(SCRIPTS_SHAPE)
        .build()
}

/// Instruction for authority-post generation.
pub fn authority_posts_prompt(niche: &str, prior: Option<&AuditResult>, language: Language) -> String {
    PromptBuilder::new("Act as a content-marketing expert for lawyers.")
        .section(format!(
            "Write {POSTS_PER_CALL} authority-building Instagram posts for {niche}. \
             Each post must position the lawyer as the reference in the field and name \
             the objective it serves (education, social proof, conversion)."
        ))
        .section_opt(prior.map(audit_context_block))
        .section(language.directive())
        .section(POSTS_SHAPE)
        .build()
}

/// Context block carrying the optimized bio lines from an earlier audit,
/// so generated content stays consistent with the profile. Empty
/// suggestions are skipped.
fn audit_context_block(audit: &AuditResult) -> String {
    let mut block =
        String::from("Profile context from a previous bio audit (optimized bio lines):");
    for suggestion in [
        &audit.line1.suggestion,
        &audit.line2.suggestion,
        &audit.line3.suggestion,
        &audit.line4.suggestion,
    ] {
        if !suggestion.is_empty() {
            block.push_str("\n- ");
            block.push_str(suggestion);
        }
    }
    block
}
