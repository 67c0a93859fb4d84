//! Billing-platform client boundary.
//!
//! [`PlatformApi`] is the injected capability the reconciliation core calls
//! out through; [`RestPlatform`] is the production implementation. Tests
//! substitute their own implementation to exercise the idempotency and retry
//! contracts without a network.

mod api;
mod rest;

pub use api::{PlatformApi, UsageAck};
pub use rest::RestPlatform;

pub(crate) use rest::validate_base_url;
