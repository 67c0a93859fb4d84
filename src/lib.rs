//! Billing Bridge: Subscription Reconciliation for Merchant Backends
//!
//! A Rust library implementing the billing state reconciliation core a
//! merchant backend needs when integrating with an external
//! subscription-billing platform: verified webhook event dispatch,
//! subscription mutation planning, proration preview splitting, and
//! idempotent metered-usage reporting.
//!
//! # What is Billing Bridge?
//!
//! Subscription billing integrations share four hard problems, and this
//! crate solves exactly those four:
//!
//! - **Event verification & dispatch**: billing events arrive at-least-once
//!   and out-of-order; each delivery is authenticated against the raw body
//!   and routed to exactly one typed handler hook
//! - **Mutation planning**: moving a subscription from its current
//!   (price, quantity) state to a desired one as a single atomic operation,
//!   never a double-prorating pair of calls
//! - **Proration splitting**: partitioning an upcoming-invoice preview into
//!   what is due now versus on the next invoice
//! - **Usage reporting**: submitting metered usage under an idempotency key
//!   so caller-driven retries apply at most once
//!
//! Everything else in a billing integration - the HTTP route table, session
//! handling, template rendering - is a thin shell that calls into these
//! components and serializes their results.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  Merchant Shell  │  HTTP routes, scheduled jobs (not this crate)
//! └────────┬─────────┘
//!          │
//! ┌────────▼────────────────────────────────────────────┐
//! │            Billing Bridge (this crate)              │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────┐  │
//! │  │   webhook   │  │ subscription │  │  platform  │  │
//! │  │  (verify +  │  │  (planner,   │  │ (injected  │  │
//! │  │  dispatch)  │  │  proration,  │──│   client   │  │
//! │  └─────────────┘  │    usage)    │  │ capability)│  │
//! │                   └──────────────┘  └─────┬──────┘  │
//! └─────────────────────────────────────────── │ ───────┘
//!                                              │ HTTPS
//!                                    ┌─────────▼─────────┐
//!                                    │  Billing Platform │
//!                                    └───────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## 1. Verify and Dispatch a Webhook Delivery
//!
//! ```rust
//! use billing_bridge::webhook::{
//!     BillingEvent, EventHandler, SignatureVerifier, verify_and_dispatch,
//! };
//!
//! struct Provisioner;
//!
//! impl EventHandler for Provisioner {
//!     fn on_invoice_paid(&self, event: &BillingEvent) {
//!         // Delivery is at-least-once: deduplicate externally by event id.
//!         println!("provision service for {:?}", event.id);
//!     }
//! }
//!
//! # fn example(raw_body: &[u8], header: Option<&str>) -> Result<(), billing_bridge::error::VerificationError> {
//! let verifier = SignatureVerifier::new(Some("whsec_...".to_owned()), 300);
//! verify_and_dispatch(&verifier, raw_body, header, &Provisioner)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## 2. Plan a Mutation and Split its Preview
//!
//! ```rust
//! use billing_bridge::subscription::{
//!     InvoicePreviewLine, PriceRef, SubscriptionItem, plan_mutation, split_preview,
//! };
//!
//! # fn example(current: &SubscriptionItem, lines: &[InvoicePreviewLine]) -> Result<(), billing_bridge::error::PlanningError> {
//! let desired = PriceRef::new("price_premium")?;
//! let plan = plan_mutation(Some(current), &desired, 5)?;
//!
//! // Hand the same batch to the preview call and the update call.
//! let batch = plan.to_update_items();
//! println!("submitting {} item change(s)", batch.len());
//!
//! // Partition the platform's preview at the current period boundary.
//! let split = split_preview(lines, current.current_period_end);
//! println!("due now: {}, next invoice: {}", split.immediate_total, split.next_invoice_sum);
//! # Ok(())
//! # }
//! ```
//!
//! ## 3. Report Metered Usage with Retry
//!
//! ```rust,no_run
//! use billing_bridge::{
//!     platform::RestPlatform,
//!     reliability::RetryPolicy,
//!     subscription::{ItemId, UsageAction, UsageRecord, UsageReport, submit_with_retry},
//! };
//! use chrono::Utc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = RestPlatform::new("https://api.billing.example.com", "sk_live_...")?;
//!
//! let report = UsageReport::new(UsageRecord {
//!     item: ItemId::new("si_metered_1"),
//!     quantity: 100,
//!     timestamp: Utc::now(),
//!     action: UsageAction::Increment,
//! });
//!
//! // Every attempt reuses the report's idempotency key, so the platform
//! // applies the usage at most once no matter how many retries run.
//! let ack = submit_with_retry(&platform, &report, &RetryPolicy::default()).await?;
//! println!("applied as {}", ack.record_id);
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`webhook`]: delivery verification and typed event dispatch
//! - [`subscription`]: mutation planner, proration splitter, usage reporter
//! - [`platform`]: injected billing-platform client capability
//! - [`reliability`]: caller-side retry policy
//! - [`config`]: shell configuration (endpoints, secret env names, prices)
//! - [`error`]: per-component error taxonomy
//!
//! # Concurrency Model
//!
//! Every component is stateless and reentrant: nothing is cached between
//! invocations, so concurrent calls for different subscriptions, items, or
//! events never interfere. Two mutations racing on the *same* subscription
//! are not serialized here - the platform applies its own per-subscription
//! serialization point, and callers needing stricter ordering should keep
//! one in-flight mutation per subscription identifier.
//!
//! # Security Considerations
//!
//! - **Verify before parsing**: signature checks always run on the raw
//!   delivery bytes; a re-serialized body would not verify
//! - **Replay windows**: delivery timestamps outside the tolerance window
//!   are rejected even with a valid digest
//! - **Unauthenticated mode**: a verifier without a secret accepts every
//!   body and is unsafe for production; every acceptance is logged
//! - **Secrets by reference**: configuration files carry env-var names, not
//!   secret values

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod platform;
pub mod reliability;
pub mod subscription;
pub mod webhook;

pub use config::BridgeConfig;
pub use error::{ConfigError, PlanningError, UsageReportError, VerificationError};
