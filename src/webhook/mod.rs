//! Webhook event verification and dispatch.
//!
//! Billing events arrive over HTTP POST with a raw JSON body and an optional
//! signature header. This module authenticates the delivery against the raw
//! bytes, interprets the envelope, and routes each verified event to exactly
//! one [`EventHandler`] hook. Events are processed one delivery per
//! invocation and never persisted; duplicate and out-of-order deliveries are
//! the handler's contract to tolerate.

mod dispatch;
mod event;
mod signature;

pub use dispatch::{DispatchOutcome, EventHandler, NoopHandler, verify_and_dispatch};
pub use event::{BillingEvent, EventKind};
pub use signature::{DEFAULT_TOLERANCE_SECS, SignatureVerifier};
