//! Subscription mutation planning.
//!
//! Separates the decision (what should change about a subscription's items)
//! from the effect (calling the platform to apply it). The planner is a pure
//! function over an item snapshot and the desired state; execution against
//! the platform belongs to the caller, which hands the plan's
//! [`to_update_items`](MutationPlan::to_update_items) projection to its
//! platform client.

use serde::Serialize;

use crate::{
    error::PlanningError,
    subscription::item::{ItemId, PriceRef, SubscriptionItem},
};

/// One operation over a subscription's items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOperation {
    /// Change the quantity of an existing item, keeping its price.
    ///
    /// Quantity-only changes never swap the item, which preserves the
    /// proration history tied to it.
    Modify {
        /// Item to modify.
        item: ItemId,
        /// New quantity.
        quantity: u64,
    },
    /// Swap an existing item for one at a different price.
    ///
    /// Realized downstream as deleting the old item and creating the new one
    /// in the same mutation batch, never as two separate calls: the platform
    /// must see one atomic proration event, not two independent ones that
    /// would double-prorate the invoice.
    Replace {
        /// Item being replaced.
        item: ItemId,
        /// Price for the replacement item.
        price: PriceRef,
        /// Quantity for the replacement item.
        quantity: u64,
    },
    /// Create the first item of a new subscription.
    Create {
        /// Price for the new item.
        price: PriceRef,
        /// Quantity for the new item.
        quantity: u64,
    },
}

/// Ordered mutation operations for one subscription.
///
/// Invariant: a plan holds exactly one terminal operation - no plan ever
/// targets two different "new" prices, and a price change preserves at most
/// one item on the subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationPlan {
    operation: ItemOperation,
}

impl MutationPlan {
    /// Returns the plan's operations in application order.
    #[must_use]
    pub fn operations(&self) -> &[ItemOperation] {
        std::slice::from_ref(&self.operation)
    }

    /// Returns `true` when applying the plan swaps the item's price.
    #[must_use]
    pub fn changes_price(&self) -> bool {
        matches!(self.operation, ItemOperation::Replace { .. })
    }

    /// Projects the plan into the platform's `subscription_items` batch.
    ///
    /// The projection is what the caller submits for both the upcoming-
    /// invoice preview and the actual update, so the preview always prices
    /// exactly the mutation that would be applied:
    ///
    /// - `Modify` → `[{id, quantity}]`
    /// - `Replace` → `[{id, deleted: true}, {price, quantity}]` (one batch)
    /// - `Create` → `[{price, quantity}]`
    #[must_use]
    pub fn to_update_items(&self) -> Vec<UpdateItemParam> {
        match &self.operation {
            ItemOperation::Modify { item, quantity } => vec![UpdateItemParam {
                id: Some(item.clone()),
                quantity: Some(*quantity),
                ..UpdateItemParam::default()
            }],
            ItemOperation::Replace { item, price, quantity } => vec![
                UpdateItemParam {
                    id: Some(item.clone()),
                    deleted: Some(true),
                    ..UpdateItemParam::default()
                },
                UpdateItemParam {
                    price: Some(price.clone()),
                    quantity: Some(*quantity),
                    ..UpdateItemParam::default()
                },
            ],
            ItemOperation::Create { price, quantity } => vec![UpdateItemParam {
                price: Some(price.clone()),
                quantity: Some(*quantity),
                ..UpdateItemParam::default()
            }],
        }
    }
}

/// One element of the platform's `subscription_items` parameter array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateItemParam {
    /// Existing item targeted by this element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    /// Price for a newly created item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<PriceRef>,
    /// Quantity to set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u64>,
    /// Marks an existing item for deletion within the batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

/// Computes the minimal mutation from a current item snapshot to a desired
/// (price, quantity) state.
///
/// - Same price: a single [`ItemOperation::Modify`], preserving the item and
///   its proration history.
/// - Different price: a single [`ItemOperation::Replace`], one atomic swap.
/// - No current item (new subscription): [`ItemOperation::Create`].
///
/// Pure: failures here are local validation only; platform errors surface
/// when the caller executes the plan.
///
/// # Errors
///
/// Returns [`PlanningError::ZeroQuantity`] for a desired quantity of zero -
/// removing a subscription is cancellation, not a zero-quantity item.
///
/// # Examples
///
/// ```
/// use billing_bridge::subscription::{PriceRef, plan_mutation};
///
/// let price = PriceRef::new("price_basic")?;
/// let plan = plan_mutation(None, &price, 3).unwrap();
/// assert_eq!(plan.operations().len(), 1);
/// # Ok::<(), billing_bridge::error::PlanningError>(())
/// ```
pub fn plan_mutation(
    current: Option<&SubscriptionItem>,
    desired_price: &PriceRef,
    desired_quantity: u64,
) -> Result<MutationPlan, PlanningError> {
    if desired_quantity == 0 {
        return Err(PlanningError::ZeroQuantity);
    }

    let operation = match current {
        Some(item) if item.price == *desired_price => ItemOperation::Modify {
            item: item.id.clone(),
            quantity: desired_quantity,
        },
        Some(item) => ItemOperation::Replace {
            item: item.id.clone(),
            price: desired_price.clone(),
            quantity: desired_quantity,
        },
        None => ItemOperation::Create {
            price: desired_price.clone(),
            quantity: desired_quantity,
        },
    };

    Ok(MutationPlan { operation })
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn item(price: &str, quantity: u64) -> SubscriptionItem {
        SubscriptionItem {
            id: ItemId::new("si_1"),
            price: PriceRef::new(price).unwrap(),
            quantity,
            current_period_end: DateTime::from_timestamp(1_712_000_000, 0).unwrap(),
        }
    }

    // ========================================================================
    // Planning Decision Tests
    // ========================================================================

    #[test]
    fn test_same_price_yields_single_modify() {
        let current = item("price_p1", 2);
        let plan = plan_mutation(Some(&current), &PriceRef::new("price_p1").unwrap(), 5).unwrap();

        assert_eq!(
            plan.operations(),
            [ItemOperation::Modify { item: ItemId::new("si_1"), quantity: 5 }]
        );
        assert!(!plan.changes_price());
    }

    #[test]
    fn test_price_change_yields_single_replace() {
        let current = item("price_p1", 2);
        let plan = plan_mutation(Some(&current), &PriceRef::new("price_p2").unwrap(), 3).unwrap();

        assert_eq!(
            plan.operations(),
            [ItemOperation::Replace {
                item: ItemId::new("si_1"),
                price: PriceRef::new("price_p2").unwrap(),
                quantity: 3,
            }]
        );
        assert!(plan.changes_price());
    }

    #[test]
    fn test_no_current_item_yields_create() {
        let plan = plan_mutation(None, &PriceRef::new("price_p1").unwrap(), 1).unwrap();

        assert_eq!(
            plan.operations(),
            [ItemOperation::Create { price: PriceRef::new("price_p1").unwrap(), quantity: 1 }]
        );
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let current = item("price_p1", 2);
        let result = plan_mutation(Some(&current), &PriceRef::new("price_p1").unwrap(), 0);
        assert_eq!(result.unwrap_err(), PlanningError::ZeroQuantity);
    }

    #[test]
    fn test_zero_quantity_rejected_for_new_subscription_too() {
        let result = plan_mutation(None, &PriceRef::new("price_p1").unwrap(), 0);
        assert_eq!(result.unwrap_err(), PlanningError::ZeroQuantity);
    }

    #[test]
    fn test_same_price_same_quantity_still_plans_modify() {
        // The planner does not second-guess no-op intent; the platform
        // treats an equal-quantity modify as a no-op on its side.
        let current = item("price_p1", 2);
        let plan = plan_mutation(Some(&current), &PriceRef::new("price_p1").unwrap(), 2).unwrap();
        assert!(matches!(plan.operations()[0], ItemOperation::Modify { quantity: 2, .. }));
    }

    // ========================================================================
    // Batch Projection Tests
    // ========================================================================

    #[test]
    fn test_modify_projects_to_one_element() {
        let current = item("price_p1", 2);
        let plan = plan_mutation(Some(&current), &PriceRef::new("price_p1").unwrap(), 5).unwrap();
        let batch = plan.to_update_items();

        assert_eq!(batch.len(), 1);
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json, serde_json::json!([{"id": "si_1", "quantity": 5}]));
    }

    #[test]
    fn test_replace_projects_to_one_atomic_batch() {
        let current = item("price_p1", 2);
        let plan = plan_mutation(Some(&current), &PriceRef::new("price_p2").unwrap(), 3).unwrap();
        let batch = plan.to_update_items();

        // Delete and create travel together; the platform sees one
        // proration event, not two.
        assert_eq!(batch.len(), 2);
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"id": "si_1", "deleted": true},
                {"price": "price_p2", "quantity": 3}
            ])
        );
    }

    #[test]
    fn test_create_projects_without_item_id() {
        let plan = plan_mutation(None, &PriceRef::new("price_p1").unwrap(), 4).unwrap();
        let json = serde_json::to_value(plan.to_update_items()).unwrap();
        assert_eq!(json, serde_json::json!([{"price": "price_p1", "quantity": 4}]));
    }
}
