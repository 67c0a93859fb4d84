//! Verified-event dispatch to typed handlers.

use tracing::{debug, instrument, warn};

use crate::{
    error::VerificationError,
    webhook::{
        event::{BillingEvent, EventKind},
        signature::SignatureVerifier,
    },
};

/// Hooks invoked once per verified delivery.
///
/// Every method defaults to a no-op: provisioning, notification, and other
/// side effects belong to the caller's business layer, which overrides the
/// hooks it cares about. Implementations must tolerate duplicate and
/// out-of-order deliveries (the platform guarantees at-least-once delivery
/// and no cross-event ordering) - a handler with side effects should
/// deduplicate externally by [`BillingEvent::id`].
pub trait EventHandler: Send + Sync {
    /// Payment collected; safe to provision the service.
    fn on_invoice_paid(&self, event: &BillingEvent) {
        let _ = event;
    }

    /// Payment failed; the subscription is now past due.
    fn on_invoice_payment_failed(&self, event: &BillingEvent) {
        let _ = event;
    }

    /// Invoice finalized; amounts are immutable from here on.
    fn on_invoice_finalized(&self, event: &BillingEvent) {
        let _ = event;
    }

    /// Subscription canceled. [`BillingEvent::request`] is present when the
    /// cancellation came from this merchant's own API call.
    fn on_subscription_deleted(&self, event: &BillingEvent) {
        let _ = event;
    }

    /// Trial ends soon; notify the customer.
    fn on_subscription_trial_ending(&self, event: &BillingEvent) {
        let _ = event;
    }

    /// Any event kind without a typed hook. Must not fail: unrecognized
    /// kinds are accepted so the platform stops redelivering them.
    fn on_unhandled(&self, kind: &str, event: &BillingEvent) {
        let _ = (kind, event);
    }
}

/// Handler that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl EventHandler for NoopHandler {}

/// Result of a successful verify-and-dispatch pass.
///
/// There is exactly one success shape: the delivery was authenticated,
/// interpreted, and routed - including to [`EventHandler::on_unhandled`] for
/// kinds without a typed hook. Rejections surface as
/// [`VerificationError`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The event was routed to its handler; carries the interpreted kind.
    Accepted(EventKind),
}

/// Verifies one delivery and routes it to the matching handler hook.
///
/// Verification runs on the raw body before any parsing. Exactly one hook
/// fires per verified event; kinds without a typed hook go to
/// [`EventHandler::on_unhandled`] and still report success, so the platform
/// does not retry indefinitely on events this consumer ignores.
///
/// # Errors
///
/// Any [`VerificationError`]. The shell should answer the delivery with a
/// non-success status so the platform retries it later.
///
/// # Examples
///
/// ```
/// use billing_bridge::webhook::{
///     DispatchOutcome, NoopHandler, SignatureVerifier, verify_and_dispatch,
/// };
///
/// let verifier = SignatureVerifier::unauthenticated();
/// let outcome = verify_and_dispatch(
///     &verifier,
///     br#"{"type":"invoice.paid"}"#,
///     None,
///     &NoopHandler,
/// )?;
/// assert!(matches!(outcome, DispatchOutcome::Accepted(_)));
/// # Ok::<(), billing_bridge::error::VerificationError>(())
/// ```
#[instrument(skip(verifier, raw_body, signature_header, handler), fields(body_len = raw_body.len()))]
pub fn verify_and_dispatch<H: EventHandler + ?Sized>(
    verifier: &SignatureVerifier,
    raw_body: &[u8],
    signature_header: Option<&str>,
    handler: &H,
) -> Result<DispatchOutcome, VerificationError> {
    verifier.verify(raw_body, signature_header)?;

    let event = BillingEvent::from_slice(raw_body)?;
    debug!(kind = %event.kind, event_id = event.id.as_deref(), "dispatching verified event");

    match &event.kind {
        EventKind::InvoicePaid => handler.on_invoice_paid(&event),
        EventKind::InvoicePaymentFailed => handler.on_invoice_payment_failed(&event),
        EventKind::InvoiceFinalized => handler.on_invoice_finalized(&event),
        EventKind::SubscriptionDeleted => handler.on_subscription_deleted(&event),
        EventKind::TrialWillEnd => handler.on_subscription_trial_ending(&event),
        EventKind::Other(kind) => {
            warn!(kind, "no typed handler for event kind");
            handler.on_unhandled(kind, &event);
        }
    }

    Ok(DispatchOutcome::Accepted(event.kind))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingHandler {
        paid: AtomicU32,
        failed: AtomicU32,
        finalized: AtomicU32,
        deleted: AtomicU32,
        trial: AtomicU32,
        unhandled: AtomicU32,
    }

    impl EventHandler for CountingHandler {
        fn on_invoice_paid(&self, _event: &BillingEvent) {
            self.paid.fetch_add(1, Ordering::Relaxed);
        }

        fn on_invoice_payment_failed(&self, _event: &BillingEvent) {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }

        fn on_invoice_finalized(&self, _event: &BillingEvent) {
            self.finalized.fetch_add(1, Ordering::Relaxed);
        }

        fn on_subscription_deleted(&self, _event: &BillingEvent) {
            self.deleted.fetch_add(1, Ordering::Relaxed);
        }

        fn on_subscription_trial_ending(&self, _event: &BillingEvent) {
            self.trial.fetch_add(1, Ordering::Relaxed);
        }

        fn on_unhandled(&self, _kind: &str, _event: &BillingEvent) {
            self.unhandled.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn dispatch(body: &[u8], handler: &CountingHandler) -> DispatchOutcome {
        verify_and_dispatch(&SignatureVerifier::unauthenticated(), body, None, handler).unwrap()
    }

    #[test]
    fn test_each_kind_routes_to_its_hook() {
        let handler = CountingHandler::default();

        dispatch(br#"{"type":"invoice.paid"}"#, &handler);
        dispatch(br#"{"type":"invoice.payment_failed"}"#, &handler);
        dispatch(br#"{"type":"invoice.finalized"}"#, &handler);
        dispatch(br#"{"type":"customer.subscription.deleted"}"#, &handler);
        dispatch(br#"{"type":"customer.subscription.trial_will_end"}"#, &handler);

        assert_eq!(handler.paid.load(Ordering::Relaxed), 1);
        assert_eq!(handler.failed.load(Ordering::Relaxed), 1);
        assert_eq!(handler.finalized.load(Ordering::Relaxed), 1);
        assert_eq!(handler.deleted.load(Ordering::Relaxed), 1);
        assert_eq!(handler.trial.load(Ordering::Relaxed), 1);
        assert_eq!(handler.unhandled.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_unknown_kind_accepted_without_typed_effects() {
        let handler = CountingHandler::default();
        let outcome = dispatch(br#"{"type":"foo.bar"}"#, &handler);

        assert_eq!(outcome, DispatchOutcome::Accepted(EventKind::Other("foo.bar".to_owned())));
        assert_eq!(handler.unhandled.load(Ordering::Relaxed), 1);
        assert_eq!(handler.paid.load(Ordering::Relaxed), 0);
        assert_eq!(handler.deleted.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_duplicate_delivery_fires_hook_each_time() {
        // At-least-once delivery: the dispatcher itself never deduplicates.
        let handler = CountingHandler::default();
        dispatch(br#"{"id":"evt_1","type":"invoice.paid"}"#, &handler);
        dispatch(br#"{"id":"evt_1","type":"invoice.paid"}"#, &handler);

        assert_eq!(handler.paid.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_malformed_body_never_reaches_handler() {
        let handler = CountingHandler::default();
        let result = verify_and_dispatch(
            &SignatureVerifier::unauthenticated(),
            b"not json",
            None,
            &handler,
        );

        assert!(matches!(result, Err(VerificationError::MalformedBody(_))));
        assert_eq!(handler.unhandled.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_unverified_body_never_parsed() {
        let verifier = SignatureVerifier::new(Some("whsec_x".to_owned()), 300);
        let handler = CountingHandler::default();

        // Valid JSON, but no signature: rejected before interpretation.
        let result =
            verify_and_dispatch(&verifier, br#"{"type":"invoice.paid"}"#, None, &handler);

        assert!(matches!(result, Err(VerificationError::BadSignature(_))));
        assert_eq!(handler.paid.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_noop_handler_accepts_everything() {
        let outcome = verify_and_dispatch(
            &SignatureVerifier::unauthenticated(),
            br#"{"type":"invoice.paid"}"#,
            None,
            &NoopHandler,
        )
        .unwrap();
        assert_eq!(outcome, DispatchOutcome::Accepted(EventKind::InvoicePaid));
    }
}
