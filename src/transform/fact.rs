use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dates::DateDimension;
use crate::domain::{OrderStatus, Snapshot};
use crate::error::Result;

/// One fact row per (order, order_item) pair. `location_id` is only
/// populated when a location lookup is supplied (Star schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRow {
    pub order_id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub date_id: u32,
    pub location_id: Option<u32>,
    pub quantity: u32,
    pub unit_price: f64,
    pub discount_percentage: f64,
    pub discount_amount: f64,
    pub subtotal: f64,
    pub total_amount: f64,
    pub order_status: OrderStatus,
}

/// Two-decimal rounding, applied once at row emission.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Joins orders against their items and emits fact rows. The order
/// date must resolve inside the date dimension's range; anything else
/// is a configuration mismatch and aborts the run. Input ordering is
/// irrelevant and output ordering is unspecified.
pub fn build_facts(
    snapshot: &Snapshot,
    dates: &DateDimension,
    locations: Option<&HashMap<i64, u32>>,
) -> Result<Vec<FactRow>> {
    let items_by_order = snapshot.items_by_order();

    let mut facts = Vec::with_capacity(snapshot.order_items.len());
    for order in &snapshot.orders {
        let date_id = dates.date_id_for(order.order_date.date())?;
        let location_id = locations.and_then(|m| m.get(&order.user_id).copied());

        let Some(items) = items_by_order.get(&order.id) else {
            continue;
        };

        for item in items {
            let subtotal = round2(item.quantity as f64 * item.price);
            let discount_amount = round2(subtotal * item.discount_percentage / 100.0);
            let total_amount = round2(subtotal - discount_amount);

            facts.push(FactRow {
                order_id: order.id,
                user_id: order.user_id,
                product_id: item.product_id,
                date_id,
                location_id,
                quantity: item.quantity,
                unit_price: item.price,
                discount_percentage: item.discount_percentage,
                discount_amount,
                subtotal,
                total_amount,
                order_status: order.status,
            });
        }
    }

    debug!(facts = facts.len(), orders = snapshot.orders.len(), "Built fact rows");
    Ok(facts)
}
