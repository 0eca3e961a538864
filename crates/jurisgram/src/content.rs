//! Typed content records produced by the gateway.
//!
//! Every record is a plain value decoded fresh from model output per
//! invocation. The gateway neither mutates nor persists them; callers
//! own copies from the moment an operation returns.

use serde::{Deserialize, Serialize};

/// Diagnosis of a single audited bio field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Short verdict on the field's current state.
    pub status: String,
    /// Diagnostic commentary.
    pub analysis: String,
    /// Suggested replacement text.
    pub suggestion: String,
}

/// Full bio audit: the profile name, the four bio lines, and general
/// recommendations.
///
/// All five findings must be present in the model output: a reply
/// missing any of them fails decoding rather than producing a partially
/// empty audit. A missing recommendations array decodes as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResult {
    pub name: Finding,
    pub line1: Finding,
    pub line2: Finding,
    pub line3: Finding,
    pub line4: Finding,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// A short attention hook for a post or reel caption.
///
/// `category` is whatever the model produced (nominally `pain`, `desire`,
/// or `curiosity`) and is passed through without validation; callers
/// decide how to treat unknown categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    pub text: String,
    pub category: String,
}

/// A short-video (Reels) script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReelScript {
    pub title: String,
    pub overview: String,
    pub hook: String,
    pub main_content: String,
    pub cta: String,
}

/// An authority-building feed post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityPost {
    pub title: String,
    pub content: String,
    pub objective: String,
}
