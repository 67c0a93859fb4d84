//! Error types for the billing bridge.
//!
//! Each reconciliation component has its own error enum so callers can match
//! on exactly the failures that component can produce. All errors implement
//! the standard [`std::error::Error`] trait via [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Delivery verification** ([`VerificationError`]): a webhook delivery
//!   failed signature, freshness, or body checks and must be rejected so the
//!   platform redelivers it later
//! - **Mutation planning** ([`PlanningError`]): local, synchronous input
//!   validation that fails before any network call is attempted
//! - **Usage reporting** ([`UsageReportError`]): the one component with a
//!   retry contract; variants distinguish retryable transport failures from
//!   terminal rejections
//! - **Configuration** ([`ConfigError`]): the shell handed the bridge an
//!   invalid or unresolvable configuration

use thiserror::Error;

/// Errors produced while verifying and interpreting a webhook delivery.
///
/// Every variant maps to a rejected delivery: the shell should answer the
/// platform with a non-success status so the delivery is retried later,
/// rather than silently swallowing the event.
#[must_use = "a rejected delivery must be surfaced to the delivering platform"]
#[derive(Debug, Error)]
pub enum VerificationError {
    /// The delivery signature is absent, unparseable, or does not match the
    /// digest recomputed over the raw body.
    ///
    /// Raised whenever a shared secret is configured and the signature check
    /// cannot positively authenticate the body. Common causes:
    /// - the wrong webhook secret is configured
    /// - the body was re-serialized by a proxy before reaching the verifier
    /// - the signature header is missing or truncated
    #[error("webhook signature verification failed: {0}")]
    BadSignature(String),

    /// The timestamp embedded in the signature header is outside the allowed
    /// tolerance window.
    ///
    /// This rejects replays of captured deliveries even when the digest
    /// itself is valid. The window is symmetric: deliveries dated too far in
    /// the future are as implausible as stale ones.
    #[error("webhook timestamp outside tolerance: skew of {skew_secs}s exceeds {tolerance_secs}s")]
    StaleTimestamp {
        /// Absolute difference between the embedded timestamp and now.
        skew_secs: i64,
        /// Configured tolerance in seconds.
        tolerance_secs: i64,
    },

    /// The body is not a parseable billing event.
    ///
    /// Raised after signature verification (or immediately in
    /// unauthenticated mode) when the body is not valid JSON or lacks the
    /// event kind discriminator.
    #[error("malformed event body: {0}")]
    MalformedBody(String),
}

/// Errors produced while planning a subscription mutation.
///
/// Planning is pure local validation: a `PlanningError` is always reported
/// before any network call is attempted, so a failed plan is never partially
/// applied.
#[must_use = "planning errors should be reported to the caller before any mutation is attempted"]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanningError {
    /// A desired quantity of zero was requested.
    ///
    /// Zero-quantity items are not a valid way to end a subscription; the
    /// caller must use cancellation instead.
    #[error("desired quantity must be positive; use cancellation instead of a zero-quantity item")]
    ZeroQuantity,

    /// The desired price reference is empty, malformed, or did not resolve.
    ///
    /// Also raised by the configuration price table when a merchant-side
    /// lookup alias has no configured platform price.
    #[error("missing or invalid price reference: {0}")]
    MissingPrice(String),
}

/// Errors produced while reporting metered usage.
///
/// The variant is the retry contract:
/// [`TransportFailure`](Self::TransportFailure) calls may be retried with the
/// **same** idempotency key, while [`Rejected`](Self::Rejected) calls are
/// terminal and must not be blindly retried.
#[must_use = "usage report errors carry the retry contract and should not be ignored"]
#[derive(Debug, Error)]
pub enum UsageReportError {
    /// The report did not definitively reach the platform.
    ///
    /// Covers timeouts, connection failures, and 5xx-class responses. The
    /// applied state is unknown; the caller should retry with the same
    /// idempotency key so the platform's deduplication guarantees at most
    /// one applied effect.
    #[error("usage report transport failure (retry with the same idempotency key): {0}")]
    TransportFailure(String),

    /// The platform (or local validation) definitively rejected the report.
    ///
    /// The platform's message is preserved verbatim. Retrying the same
    /// report will fail the same way; the caller must fix the input.
    #[error("usage report rejected: {0}")]
    Rejected(String),
}

/// Errors produced while loading or validating bridge configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration parsed but failed a validation rule.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The configuration text is not valid TOML for
    /// [`BridgeConfig`](crate::config::BridgeConfig).
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A secret referenced by environment-variable name is not set.
    #[error("environment variable {0} is not set")]
    MissingEnv(String),
}
