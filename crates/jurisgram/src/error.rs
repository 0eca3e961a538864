use thiserror::Error;

use crate::retry;

/// Errors surfaced by the gateway.
///
/// Remote failures keep the provider's message verbatim so callers (and
/// the retry loop) can classify them by content; decode failures keep the
/// full raw reply for diagnostics. Nothing is ever silently substituted
/// with a guessed value.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The remote model call failed: transport error, non-2xx status, or
    /// an API-reported failure. The message is surfaced unchanged through
    /// the retry loop.
    #[error("model invocation failed: {0}")]
    Remote(String),

    /// No JSON value matching the expected shape could be recovered from
    /// the model output. `raw` is the untouched reply text.
    #[error("malformed model response: {detail}")]
    MalformedResponse { detail: String, raw: String },
}

impl GatewayError {
    /// Whether this error indicates quota or rate-limit exhaustion, i.e.
    /// is expected to succeed on retry after a delay.
    pub fn is_quota(&self) -> bool {
        matches!(self, GatewayError::Remote(msg) if retry::is_quota_error(msg))
    }
}
