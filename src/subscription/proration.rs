//! Proration preview splitting.
//!
//! When a mutation is previewed against the platform's upcoming invoice, the
//! returned line items mix proration adjustments inside the current billing
//! period with full charges for the next one. Splitting them tells the
//! customer what is due now versus on the next invoice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::subscription::item::ItemId;

/// One line of an upcoming-invoice preview.
///
/// Immutable once returned by the platform. Amounts are signed minor
/// currency units: downgrade credits arrive as negative lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePreviewLine {
    /// Signed amount in minor currency units.
    pub amount: i64,
    /// End of the period this line covers.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub period_end: DateTime<Utc>,
    /// Subscription item the line originates from, when the platform
    /// attributes it.
    pub item: Option<ItemId>,
}

/// Preview lines partitioned against a billing-period boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProrationSplit {
    /// Sum of lines inside the current period: due now.
    pub immediate_total: i64,
    /// Sum of every other line: due on the next invoice.
    pub next_invoice_sum: i64,
}

/// Partitions preview lines into due-now and due-next-period buckets.
///
/// A line is immediate iff its `period_end` equals `current_period_end`,
/// meaning it is a proration adjustment inside the subscription's active
/// period; all other lines are full charges for future periods. Credits
/// (negative amounts) offset debits naturally in each bucket.
///
/// Conservation invariant: no line is dropped or double-counted, so
/// `immediate_total + next_invoice_sum` always equals the sum of all input
/// amounts.
///
/// # Examples
///
/// ```
/// use billing_bridge::subscription::{InvoicePreviewLine, split_preview};
/// use chrono::DateTime;
///
/// let period_end = DateTime::from_timestamp(1_712_000_000, 0).unwrap();
/// let later = DateTime::from_timestamp(1_714_000_000, 0).unwrap();
/// let lines = vec![
///     InvoicePreviewLine { amount: 500, period_end, item: None },
///     InvoicePreviewLine { amount: 1200, period_end: later, item: None },
/// ];
///
/// let split = split_preview(&lines, period_end);
/// assert_eq!(split.immediate_total, 500);
/// assert_eq!(split.next_invoice_sum, 1200);
/// ```
#[must_use]
pub fn split_preview(
    lines: &[InvoicePreviewLine],
    current_period_end: DateTime<Utc>,
) -> ProrationSplit {
    lines.iter().fold(ProrationSplit::default(), |mut split, line| {
        if line.period_end == current_period_end {
            split.immediate_total += line.amount;
        } else {
            split.next_invoice_sum += line.amount;
        }
        split
    })
}

/// An upcoming-invoice preview, split when a period boundary applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpcomingPreview {
    /// Preview for an existing subscription, partitioned at its current
    /// period boundary.
    Split {
        /// Due-now / due-next totals.
        split: ProrationSplit,
        /// The underlying preview lines.
        lines: Vec<InvoicePreviewLine>,
    },
    /// Preview for a new subscription: there is no existing period boundary,
    /// so the split has no meaning and the raw lines pass through.
    Unsplit {
        /// The underlying preview lines.
        lines: Vec<InvoicePreviewLine>,
    },
}

/// Builds the preview result for a mutation, splitting only when an existing
/// subscription supplies a period boundary.
#[must_use]
pub fn preview_upcoming(
    lines: Vec<InvoicePreviewLine>,
    current_period_end: Option<DateTime<Utc>>,
) -> UpcomingPreview {
    match current_period_end {
        Some(period_end) => {
            UpcomingPreview::Split { split: split_preview(&lines, period_end), lines }
        }
        None => UpcomingPreview::Unsplit { lines },
    }
}
