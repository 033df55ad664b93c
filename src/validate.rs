use std::collections::HashSet;

use tracing::{info, warn};

use crate::domain::Snapshot;
use crate::transform::fact::{round2, FactRow};

/// One finding from a validation pass, tied to the table it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub table: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.table, self.message)
    }
}

/// Collected findings from validating a snapshot or transform output.
/// Errors fail the run's quality gate; warnings do not.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, table: &'static str, message: String) {
        self.errors.push(ValidationIssue { table, message });
    }

    fn warning(&mut self, table: &'static str, message: String) {
        self.warnings.push(ValidationIssue { table, message });
    }

    fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Validates a normalized snapshot: required fields, unique ids, and
/// referential integrity. Dirty data is reported, never panicked on;
/// missing optional references are warnings only.
pub fn validate_snapshot(snapshot: &Snapshot) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_unique_ids(&mut report, "users", snapshot.users.iter().map(|u| u.id));
    check_unique_ids(&mut report, "products", snapshot.products.iter().map(|p| p.id));
    check_unique_ids(&mut report, "orders", snapshot.orders.iter().map(|o| o.id));
    check_unique_ids(&mut report, "order_items", snapshot.order_items.iter().map(|i| i.id));

    let users = snapshot.users_by_id();
    let addresses = snapshot.addresses_by_id();
    let categories = snapshot.categories_by_id();
    let products = snapshot.products_by_id();
    let order_ids: HashSet<i64> = snapshot.orders.iter().map(|o| o.id).collect();

    for user in &snapshot.users {
        if user.email.is_empty() || !user.email.contains('@') {
            report.error("users", format!("user {}: invalid email '{}'", user.id, user.email));
        }
        if user.username.is_empty() {
            report.error("users", format!("user {}: empty username", user.id));
        }
        if let Some(address_id) = user.address_id {
            if !addresses.contains_key(&address_id) {
                report.warning(
                    "users",
                    format!("user {}: address {address_id} not in snapshot", user.id),
                );
            }
        }
    }

    for product in &snapshot.products {
        if product.title.is_empty() {
            report.error("products", format!("product {}: empty title", product.id));
        }
        if product.price < 0.0 {
            report.error(
                "products",
                format!("product {}: negative price {}", product.id, product.price),
            );
        }
        if let Some(category_id) = product.category_id {
            if !categories.contains_key(&category_id) {
                report.warning(
                    "products",
                    format!("product {}: category {category_id} not in snapshot", product.id),
                );
            }
        }
    }

    for category in &snapshot.categories {
        if let Some(parent_id) = category.parent_id {
            if !categories.contains_key(&parent_id) {
                report.warning(
                    "categories",
                    format!("category {}: parent {parent_id} not in snapshot", category.id),
                );
            }
        }
    }

    for order in &snapshot.orders {
        if !users.contains_key(&order.user_id) {
            report.error(
                "orders",
                format!("order {}: user {} not in snapshot", order.id, order.user_id),
            );
        }
    }

    for item in &snapshot.order_items {
        if !order_ids.contains(&item.order_id) {
            report.error(
                "order_items",
                format!("item {}: order {} not in snapshot", item.id, item.order_id),
            );
        }
        if !products.contains_key(&item.product_id) {
            report.error(
                "order_items",
                format!("item {}: product {} not in snapshot", item.id, item.product_id),
            );
        }
        if item.quantity == 0 {
            report.error("order_items", format!("item {}: zero quantity", item.id));
        }
        if item.price < 0.0 {
            report.error(
                "order_items",
                format!("item {}: negative price {}", item.id, item.price),
            );
        }
    }

    log_report(&report, "snapshot");
    report
}

/// Verifies the measure identities on emitted fact rows within a 0.01
/// rounding tolerance.
pub fn validate_facts(facts: &[FactRow]) -> ValidationReport {
    const TOLERANCE: f64 = 0.01;

    let mut report = ValidationReport::default();
    for fact in facts {
        let expected_subtotal = round2(fact.quantity as f64 * fact.unit_price);
        if (fact.subtotal - expected_subtotal).abs() > TOLERANCE {
            report.error(
                "facts",
                format!(
                    "order {} product {}: subtotal {} != {}",
                    fact.order_id, fact.product_id, fact.subtotal, expected_subtotal
                ),
            );
        }

        let expected_total = round2(fact.subtotal - fact.discount_amount);
        if (fact.total_amount - expected_total).abs() > TOLERANCE {
            report.error(
                "facts",
                format!(
                    "order {} product {}: total_amount {} != {}",
                    fact.order_id, fact.product_id, fact.total_amount, expected_total
                ),
            );
        }
    }

    log_report(&report, "facts");
    report
}

/// Full pass: snapshot integrity plus fact measure identities.
pub fn validate_run(snapshot: &Snapshot, facts: &[FactRow]) -> ValidationReport {
    let mut report = validate_snapshot(snapshot);
    report.merge(validate_facts(facts));
    report
}

fn check_unique_ids(
    report: &mut ValidationReport,
    table: &'static str,
    ids: impl Iterator<Item = i64>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            report.error(table, format!("duplicate id {id}"));
        }
    }
}

fn log_report(report: &ValidationReport, scope: &str) {
    if report.passed() {
        info!(
            warnings = report.warnings.len(),
            "Validation passed for {scope}"
        );
    } else {
        warn!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Validation failed for {scope}"
        );
    }
}
