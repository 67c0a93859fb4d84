//! Metered usage reporting with idempotent, retry-safe semantics.
//!
//! A usage report is the only operation in this crate with a retry contract.
//! The report binds its record to an idempotency key at construction, so
//! retrying a failed submission reuses the key by construction and the
//! platform's deduplication guarantees at most one applied effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::UsageReportError,
    platform::{PlatformApi, UsageAck},
    reliability::{RetryPolicy, is_retryable, retry_with_backoff},
    subscription::item::ItemId,
};

/// Maximum allowed usage quantity to prevent overflow and abuse.
/// Set to 1 trillion units (10^12).
pub const MAX_USAGE_QUANTITY: u64 = 1_000_000_000_000;

/// Usage reporting action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageAction {
    /// Replace the accumulated usage for the window.
    Set,
    /// Add to the accumulated usage.
    Increment,
}

/// One metered usage observation for a subscription item.
///
/// Negative quantities are unrepresentable by type; the remaining local
/// checks live in [`validate`](Self::validate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Metered subscription item the usage belongs to.
    pub item: ItemId,
    /// Usage quantity.
    pub quantity: u64,
    /// When the usage occurred.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    /// Whether the quantity replaces or increments the window's total.
    pub action: UsageAction,
}

impl UsageRecord {
    /// Validates the record before any network call.
    ///
    /// # Errors
    ///
    /// Returns a terminal [`UsageReportError::Rejected`] if the quantity
    /// exceeds [`MAX_USAGE_QUANTITY`] or the timestamp is in the future.
    /// Past timestamps are accepted: interval reporters legitimately backfill
    /// usage observed since their last run.
    pub fn validate(&self) -> Result<(), UsageReportError> {
        if self.quantity > MAX_USAGE_QUANTITY {
            return Err(UsageReportError::Rejected(format!(
                "usage quantity {} exceeds maximum allowed value of {MAX_USAGE_QUANTITY}",
                self.quantity
            )));
        }
        if self.timestamp > Utc::now() {
            return Err(UsageReportError::Rejected(
                "usage timestamp cannot be in the future".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Key the platform deduplicates usage submissions on.
///
/// Contract: a key must always carry the same (item, quantity, timestamp,
/// action) tuple if reused. [`UsageReport`] upholds this by binding the key
/// to its record; never attach an old key to a new record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Generates a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A usage record bound to the idempotency key it will be submitted under.
///
/// Construct with [`new`](Self::new) for a fresh logical report, or
/// [`retry_of`](Self::retry_of) when resubmitting a report whose previous
/// attempt failed in transport - reusing the key is what makes the retry
/// safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageReport {
    record: UsageRecord,
    key: IdempotencyKey,
}

impl UsageReport {
    /// Starts a fresh logical report with a newly generated key.
    #[must_use]
    pub fn new(record: UsageRecord) -> Self {
        Self { record, key: IdempotencyKey::generate() }
    }

    /// Rebuilds a report for an explicit retry of a prior failed attempt.
    ///
    /// The caller must pass the same record the key was originally bound to;
    /// the platform deduplicates on the key and will reject a mismatched
    /// tuple.
    #[must_use]
    pub fn retry_of(record: UsageRecord, key: IdempotencyKey) -> Self {
        Self { record, key }
    }

    /// Returns the record to be submitted.
    #[must_use]
    pub fn record(&self) -> &UsageRecord {
        &self.record
    }

    /// Returns the idempotency key the submission travels under.
    #[must_use]
    pub fn idempotency_key(&self) -> &IdempotencyKey {
        &self.key
    }
}

/// Submits one usage report through the injected platform client.
///
/// Exactly one outbound call. On [`UsageReportError::TransportFailure`] the
/// caller may call again with the **same** [`UsageReport`] value (same key);
/// on [`UsageReportError::Rejected`] the report must not be retried blindly.
///
/// # Errors
///
/// Local validation failures surface as terminal
/// [`UsageReportError::Rejected`] before any network call; platform failures
/// pass through with the platform's message preserved.
#[instrument(
    skip(platform, report),
    fields(item = %report.record.item, quantity = report.record.quantity)
)]
pub async fn submit<P: PlatformApi>(
    platform: &P,
    report: &UsageReport,
) -> Result<UsageAck, UsageReportError> {
    report.record.validate()?;

    let ack = platform.submit_usage_record(&report.record, &report.key).await?;
    info!(record_id = %ack.record_id, "usage report acknowledged");
    Ok(ack)
}

/// Submits a usage report, retrying transport failures with backoff.
///
/// This is the caller-side retry policy layered on the idempotent contract:
/// every attempt reuses the report's key, terminal rejections abort
/// immediately, and no retry state outlives the call.
///
/// # Errors
///
/// The last [`UsageReportError::TransportFailure`] once attempts are
/// exhausted, or the first [`UsageReportError::Rejected`].
#[instrument(skip(platform, report, policy), fields(item = %report.record.item))]
pub async fn submit_with_retry<P: PlatformApi>(
    platform: &P,
    report: &UsageReport,
    policy: &RetryPolicy,
) -> Result<UsageAck, UsageReportError> {
    retry_with_backoff(policy, is_retryable, || submit(platform, report)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(quantity: u64) -> UsageRecord {
        UsageRecord {
            item: ItemId::new("si_metered"),
            quantity,
            timestamp: Utc::now(),
            action: UsageAction::Increment,
        }
    }

    // ========================================================================
    // Record Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_accepts_reasonable_record() {
        assert!(record(100).validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_max_quantity() {
        assert!(record(MAX_USAGE_QUANTITY).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_excessive_quantity() {
        let result = record(MAX_USAGE_QUANTITY + 1).validate();
        assert!(matches!(result, Err(UsageReportError::Rejected(_))));
    }

    #[test]
    fn test_validate_rejects_future_timestamp() {
        let mut rec = record(10);
        rec.timestamp = Utc::now() + chrono::Duration::hours(1);
        assert!(matches!(rec.validate(), Err(UsageReportError::Rejected(_))));
    }

    #[test]
    fn test_validate_accepts_past_timestamp() {
        // Interval reporters backfill the usage observed since the last run.
        let mut rec = record(10);
        rec.timestamp = Utc::now() - chrono::Duration::hours(20);
        assert!(rec.validate().is_ok());
    }

    // ========================================================================
    // Report Construction Tests
    // ========================================================================

    #[test]
    fn test_fresh_reports_get_distinct_keys() {
        let a = UsageReport::new(record(1));
        let b = UsageReport::new(record(1));
        assert_ne!(a.idempotency_key(), b.idempotency_key());
    }

    #[test]
    fn test_retry_reuses_key() {
        let first = UsageReport::new(record(42));
        let key = first.idempotency_key().clone();

        let retry = UsageReport::retry_of(first.record().clone(), key.clone());
        assert_eq!(retry.idempotency_key(), &key);
        assert_eq!(retry.record(), first.record());
    }

    #[test]
    fn test_action_serialization() {
        assert_eq!(serde_json::to_string(&UsageAction::Set).unwrap(), "\"set\"");
        assert_eq!(serde_json::to_string(&UsageAction::Increment).unwrap(), "\"increment\"");
    }
}
