//! Subscription item identifiers and snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlanningError;

/// Platform-assigned identifier of a subscription item.
///
/// Opaque: the billing platform mints these and this bridge never inspects
/// their structure, so construction is infallible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    /// Wraps a platform-assigned identifier.
    #[must_use]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a platform price.
///
/// Unlike [`ItemId`], price references cross the trust boundary in the other
/// direction - callers supply them - so they are validated on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceRef(String);

impl PriceRef {
    /// Creates a price reference after validation.
    ///
    /// # Errors
    ///
    /// Returns [`PlanningError::MissingPrice`] if the reference is empty,
    /// exceeds 64 characters, or contains characters outside alphanumerics,
    /// hyphens, and underscores.
    pub fn new<S: Into<String>>(price: S) -> Result<Self, PlanningError> {
        let price = price.into();
        if price.is_empty() {
            return Err(PlanningError::MissingPrice("price reference is empty".to_owned()));
        }
        if price.len() > 64 {
            return Err(PlanningError::MissingPrice(format!(
                "price reference exceeds 64 characters: {price}"
            )));
        }
        if !price.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(PlanningError::MissingPrice(format!(
                "price reference contains invalid characters: {price}"
            )));
        }
        Ok(Self(price))
    }

    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PriceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read snapshot of one subscription item.
///
/// Owned by the billing platform; the bridge holds a snapshot for the
/// duration of a single call and never caches it across calls, so two
/// invocations always re-read current platform state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionItem {
    /// Platform-assigned item identifier.
    pub id: ItemId,
    /// Price currently attached to the item.
    pub price: PriceRef,
    /// Current quantity (seats, licenses).
    pub quantity: u64,
    /// End of the subscription's current billing period.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub current_period_end: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // PriceRef Tests
    // ========================================================================

    #[test]
    fn test_price_ref_valid() {
        let price = PriceRef::new("price_1Example").unwrap();
        assert_eq!(price.as_str(), "price_1Example");
    }

    #[test]
    fn test_price_ref_empty_rejected() {
        let result = PriceRef::new("");
        assert!(matches!(result, Err(PlanningError::MissingPrice(_))));
    }

    #[test]
    fn test_price_ref_too_long_rejected() {
        let result = PriceRef::new("p".repeat(65));
        assert!(matches!(result, Err(PlanningError::MissingPrice(_))));
    }

    #[test]
    fn test_price_ref_exactly_64_chars_accepted() {
        assert!(PriceRef::new("p".repeat(64)).is_ok());
    }

    #[test]
    fn test_price_ref_rejects_whitespace_and_symbols() {
        assert!(PriceRef::new("price 1").is_err());
        assert!(PriceRef::new("price/1").is_err());
        assert!(PriceRef::new("price@1").is_err());
    }

    // ========================================================================
    // ItemId Tests
    // ========================================================================

    #[test]
    fn test_item_id_is_opaque() {
        // Whatever the platform mints is accepted verbatim.
        let id = ItemId::new("si_OqXyz!?");
        assert_eq!(id.as_str(), "si_OqXyz!?");
        assert_eq!(id.to_string(), "si_OqXyz!?");
    }

    // ========================================================================
    // SubscriptionItem Tests
    // ========================================================================

    #[test]
    fn test_item_snapshot_serde_roundtrip() {
        let item = SubscriptionItem {
            id: ItemId::new("si_1"),
            price: PriceRef::new("price_basic").unwrap(),
            quantity: 4,
            current_period_end: DateTime::from_timestamp(1_712_000_000, 0).unwrap(),
        };

        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"current_period_end\":1712000000"));

        let parsed: SubscriptionItem = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, item);
    }
}
