//! Billing-platform client capability.

use serde::{Deserialize, Serialize};

use crate::{
    error::UsageReportError,
    subscription::{IdempotencyKey, ItemId, UsageRecord},
};

/// Acknowledgement returned by the platform for an applied usage record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageAck {
    /// Platform-assigned identifier of the applied record.
    pub record_id: String,
    /// Item the usage was recorded against.
    pub item: ItemId,
    /// Quantity the platform accepted.
    pub quantity: u64,
}

/// Capability for talking to the billing platform.
///
/// Passed explicitly into the operations that need it instead of living in a
/// process-global SDK handle, so every component can be exercised against a
/// substitute implementation. The bridge performs network I/O only for usage
/// reporting; mutation plans are executed by the caller's own client against
/// this same boundary.
///
/// # Contract
///
/// Implementations must deduplicate on the idempotency key: a resubmission
/// under a key the platform has already applied returns the original
/// acknowledgement without a second effect, and a key reused with a
/// different (item, quantity, timestamp, action) tuple is a
/// [`UsageReportError::Rejected`].
pub trait PlatformApi: Send + Sync {
    /// Submits one usage record under the given idempotency key.
    ///
    /// # Errors
    ///
    /// [`UsageReportError::TransportFailure`] when the outcome is unknown
    /// (retryable under the same key); [`UsageReportError::Rejected`] for a
    /// definitive platform rejection.
    fn submit_usage_record(
        &self,
        record: &UsageRecord,
        key: &IdempotencyKey,
    ) -> impl Future<Output = Result<UsageAck, UsageReportError>> + Send;
}
