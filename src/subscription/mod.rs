//! Subscription reconciliation: mutation planning, proration splitting, and
//! metered usage reporting.
//!
//! The planner and splitter are pure functions over explicit inputs; usage
//! reporting performs one outbound call through the injected
//! [`PlatformApi`](crate::platform::PlatformApi) capability. Nothing here
//! retains state between invocations.

mod item;
mod planner;
mod proration;
mod usage;

pub use item::{ItemId, PriceRef, SubscriptionItem};
pub use planner::{ItemOperation, MutationPlan, UpdateItemParam, plan_mutation};
pub use proration::{
    InvoicePreviewLine, ProrationSplit, UpcomingPreview, preview_upcoming, split_preview,
};
pub use usage::{
    IdempotencyKey, MAX_USAGE_QUANTITY, UsageAction, UsageRecord, UsageReport, submit,
    submit_with_retry,
};

#[cfg(test)]
mod tests {
    mod proptest_reconciliation;
}
