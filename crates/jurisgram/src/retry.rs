//! Automatic retry with exponential backoff and jitter for quota errors.
//!
//! Retries rate-limit/quota failures (HTTP 429, `RESOURCE_EXHAUSTED`,
//! "quota exceeded") with configurable exponential backoff. Every other
//! remote failure (auth, malformed request, network) propagates
//! immediately without a delay.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::GatewayError;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries (0 = fail on the first error).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Backoff multiplier applied per attempt (2.0 doubles the delay).
    pub multiplier: f64,
    /// Upper bound of the uniform random jitter added to every delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(2000),
            multiplier: 2.0,
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy with the given number of retries and default timing.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_retries: retries,
            ..Default::default()
        }
    }

    /// Exponential delay for a given attempt number (0-indexed), before
    /// jitter: `initial_delay * multiplier^attempt`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32))
    }

    /// Full delay for an attempt: the exponential base plus uniform random
    /// jitter in `[0, max_jitter]`, drawn fresh on every call so
    /// concurrent callers don't retry in lockstep.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let jitter_bound = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_bound == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_bound))
        };
        self.base_delay(attempt) + jitter
    }
}

/// Whether an error message indicates quota or rate-limit exhaustion.
///
/// Matches case-insensitively against the markers the provider uses
/// across its HTTP status line, error JSON body, and gRPC-style status
/// strings.
pub fn is_quota_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    [
        "429",
        "quota",
        "rate limit",
        "rate_limit",
        "resource exhausted",
        "resource_exhausted",
        "too many requests",
    ]
    .iter()
    .any(|m| lower.contains(m))
}

/// Run a remote call, retrying quota failures with exponential backoff.
///
/// Non-quota errors propagate immediately. After the retry budget is
/// spent, the last underlying error is returned unchanged so callers can
/// still classify it. The backoff sleep suspends only this invocation;
/// concurrent invocations each own their attempt counter.
pub async fn invoke_with_retry<T, F, Fut>(policy: &RetryPolicy, mut call: F) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt < policy.max_retries && e.is_quota() {
                    let delay = policy.delay_for_attempt(attempt);
                    warn!(
                        "quota error (attempt {}/{}): {e}. retrying in {delay:?}...",
                        attempt + 1,
                        policy.max_retries,
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                } else {
                    return Err(e);
                }
            }
        }
    }
}
