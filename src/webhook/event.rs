//! Billing event interpretation.
//!
//! Events arrive as JSON bodies after delivery verification. The bridge
//! interprets only the envelope (kind, id, timestamps); the event payload
//! stays opaque for the caller's business layer. Events are never persisted
//! here: received, verified, dispatched, discarded.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::VerificationError;

/// Kind of a billing event, as delivered in the body's `type` field.
///
/// The typed variants cover the events this bridge consumes; every other
/// kind is preserved verbatim in [`Other`](Self::Other) and routed to the
/// unhandled hook rather than rejected, so the platform does not retry
/// deliveries the consumer does not care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `invoice.paid` - payment collected; safe to provision service.
    InvoicePaid,
    /// `invoice.payment_failed` - subscription becomes past due.
    InvoicePaymentFailed,
    /// `invoice.finalized` - invoice amounts are now immutable.
    InvoiceFinalized,
    /// `customer.subscription.deleted` - subscription canceled, by request
    /// or automatically by the platform's settings.
    SubscriptionDeleted,
    /// `customer.subscription.trial_will_end` - trial ends soon; notify the
    /// customer.
    TrialWillEnd,
    /// Any kind this bridge has no typed handler for.
    Other(String),
}

impl EventKind {
    /// Interprets a wire `type` string.
    #[must_use]
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "invoice.paid" => Self::InvoicePaid,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "invoice.finalized" => Self::InvoiceFinalized,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "customer.subscription.trial_will_end" => Self::TrialWillEnd,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns the wire `type` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvoicePaid => "invoice.paid",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::InvoiceFinalized => "invoice.finalized",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::TrialWillEnd => "customer.subscription.trial_will_end",
            Self::Other(kind) => kind,
        }
    }

    /// Returns `true` when the kind has a typed handler method.
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One verified billing event delivery.
///
/// Delivery is at-least-once and unordered: the same logical event may
/// arrive more than once, and later events may arrive first. Handlers must
/// tolerate both; a consumer with side effects must deduplicate externally
/// by [`id`](Self::id).
#[derive(Debug, Clone)]
pub struct BillingEvent {
    /// Platform-assigned event identifier (the external deduplication key).
    pub id: Option<String>,
    /// Interpreted event kind.
    pub kind: EventKind,
    /// When the platform created the event.
    pub created: Option<DateTime<Utc>>,
    /// The event's `data` member, kept opaque. For most kinds the affected
    /// object lives at `payload["object"]`.
    pub payload: Value,
    /// Present when the event was caused by an API call this merchant made,
    /// letting handlers distinguish requested from automatic transitions
    /// (e.g. a cancellation the merchant initiated versus one the platform
    /// applied on its own).
    pub request: Option<Value>,
}

/// Wire shape of an event envelope.
#[derive(Deserialize)]
struct WireEvent {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    created: Option<i64>,
    #[serde(default)]
    data: Value,
    request: Option<Value>,
}

impl BillingEvent {
    /// Parses a verified raw body into an event.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::MalformedBody`] if the body is not valid
    /// JSON or lacks the `type` discriminator.
    pub fn from_slice(raw_body: &[u8]) -> Result<Self, VerificationError> {
        let wire: WireEvent = serde_json::from_slice(raw_body)
            .map_err(|e| VerificationError::MalformedBody(e.to_string()))?;

        Ok(Self {
            id: wire.id,
            kind: EventKind::from_wire(&wire.kind),
            created: wire.created.and_then(|secs| DateTime::from_timestamp(secs, 0)),
            payload: wire.data,
            request: wire.request,
        })
    }

    /// Returns the affected platform object, when the payload carries one.
    #[must_use]
    pub fn object(&self) -> Option<&Value> {
        self.payload.get("object")
    }
}
