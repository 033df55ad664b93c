use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::transform::fact::{round2, FactRow};

/// Revenue rolled up per product, sorted by product id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRevenue {
    pub product_id: i64,
    pub order_count: usize,
    pub total_quantity: u64,
    pub total_revenue: f64,
}

/// Revenue rolled up per calendar month, with month-over-month growth.
/// `growth_pct` is `None` for the first month and whenever the prior
/// month's revenue is zero; a zero denominator is not an error and
/// never produces NaN/inf.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: u32,
    pub orders_count: usize,
    pub revenue: f64,
    pub growth_pct: Option<f64>,
}

pub fn revenue_by_product(facts: &[FactRow]) -> Vec<ProductRevenue> {
    let mut by_product: BTreeMap<i64, (HashSet<i64>, u64, f64)> = BTreeMap::new();

    for fact in facts {
        let entry = by_product.entry(fact.product_id).or_default();
        entry.0.insert(fact.order_id);
        entry.1 += fact.quantity as u64;
        entry.2 += fact.total_amount;
    }

    by_product
        .into_iter()
        .map(|(product_id, (orders, quantity, revenue))| ProductRevenue {
            product_id,
            order_count: orders.len(),
            total_quantity: quantity,
            total_revenue: round2(revenue),
        })
        .collect()
}

pub fn monthly_revenue(facts: &[FactRow]) -> Vec<MonthlyRevenue> {
    // date_id is the YYYYMMDD encoding; month buckets fall out of it
    // without a calendar lookup.
    let mut by_month: BTreeMap<(i32, u32), (HashSet<i64>, f64)> = BTreeMap::new();

    for fact in facts {
        let year = (fact.date_id / 10_000) as i32;
        let month = fact.date_id / 100 % 100;
        let entry = by_month.entry((year, month)).or_default();
        entry.0.insert(fact.order_id);
        entry.1 += fact.total_amount;
    }

    let mut result = Vec::with_capacity(by_month.len());
    let mut prior_revenue: Option<f64> = None;
    for ((year, month), (orders, revenue)) in by_month {
        let revenue = round2(revenue);
        let growth_pct = match prior_revenue {
            Some(prior) if prior != 0.0 => Some(round2((revenue - prior) / prior * 100.0)),
            _ => None,
        };
        prior_revenue = Some(revenue);

        result.push(MonthlyRevenue {
            year,
            month,
            orders_count: orders.len(),
            revenue,
            growth_pct,
        });
    }

    result
}
