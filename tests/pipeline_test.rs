use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};

use mart_builder::config::TransformConfig;
use mart_builder::domain::{Order, OrderItem, OrderStatus, Snapshot};
use mart_builder::error::EtlError;
use mart_builder::sink::{InMemorySink, SchemaSink};
use mart_builder::testdata::{generate_snapshot, GeneratorOptions};
use mart_builder::transform::fact::round2;
use mart_builder::{analytics, transform, validate};

fn config_2024() -> TransformConfig {
    TransformConfig {
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        ..Default::default()
    }
}

fn sample_snapshot(config: &TransformConfig) -> Snapshot {
    generate_snapshot(&GeneratorOptions {
        seed: 1234,
        users: 25,
        products: 40,
        orders: 80,
        start_date: config.start_date,
        end_date: config.end_date,
    })
}

#[test]
fn date_dimension_covers_range_exactly() {
    let config = config_2024();
    let star = transform::build_star(&sample_snapshot(&config), &config).unwrap();

    assert_eq!(star.dates.len(), 366);
    assert_eq!(star.dates.first().unwrap().full_date, config.start_date);
    assert_eq!(star.dates.last().unwrap().full_date, config.end_date);

    let distinct: HashSet<u32> = star.dates.iter().map(|d| d.date_id).collect();
    assert_eq!(distinct.len(), star.dates.len());

    for row in &star.dates {
        let weekend = matches!(row.day_of_week, 6 | 7);
        assert_eq!(row.is_weekend, weekend, "bad weekend flag on {}", row.full_date);
    }
}

#[test]
fn transform_is_idempotent() {
    let config = config_2024();
    let snapshot = sample_snapshot(&config);

    let star_a = transform::build_star(&snapshot, &config).unwrap();
    let star_b = transform::build_star(&snapshot, &config).unwrap();
    assert_eq!(
        serde_json::to_string(&star_a).unwrap(),
        serde_json::to_string(&star_b).unwrap()
    );

    let snow_a = transform::build_snowflake(&snapshot, &config).unwrap();
    let snow_b = transform::build_snowflake(&snapshot, &config).unwrap();
    assert_eq!(
        serde_json::to_string(&snow_a).unwrap(),
        serde_json::to_string(&snow_b).unwrap()
    );
}

#[test]
fn fact_revenue_matches_source_items() {
    let config = config_2024();
    let snapshot = sample_snapshot(&config);
    let star = transform::build_star(&snapshot, &config).unwrap();

    // Per-product fact revenue vs. totals recomputed from the source
    // order items, within the rounding tolerance.
    let rollup = analytics::revenue_by_product(&star.facts);
    for product in &rollup {
        let source_total: f64 = snapshot
            .order_items
            .iter()
            .filter(|i| i.product_id == product.product_id)
            .map(|i| {
                let raw = i.quantity as f64 * i.price;
                raw - raw * i.discount_percentage / 100.0
            })
            .sum();

        let items = snapshot
            .order_items
            .iter()
            .filter(|i| i.product_id == product.product_id)
            .count() as f64;
        assert!(
            (product.total_revenue - source_total).abs() <= 0.01 * items.max(1.0),
            "product {} revenue {} drifted from source {}",
            product.product_id,
            product.total_revenue,
            source_total
        );
    }
}

#[test]
fn fact_measures_hold_invariants() {
    let config = config_2024();
    let star = transform::build_star(&sample_snapshot(&config), &config).unwrap();

    assert!(!star.facts.is_empty());
    for fact in &star.facts {
        assert_eq!(fact.subtotal, round2(fact.quantity as f64 * fact.unit_price));
        assert_eq!(fact.total_amount, round2(fact.subtotal - fact.discount_amount));
    }
    assert!(validate::validate_facts(&star.facts).passed());
}

#[test]
fn snowflake_foreign_keys_resolve() {
    let config = config_2024();
    let snow = transform::build_snowflake(&sample_snapshot(&config), &config).unwrap();

    let category_ids: HashSet<u32> = snow.categories.iter().map(|c| c.category_id).collect();
    let brand_ids: HashSet<u32> = snow.brands.iter().map(|b| b.brand_id).collect();
    let state_ids: HashSet<u32> = snow.states.iter().map(|s| s.state_id).collect();
    let city_ids: HashSet<u32> = snow.cities.iter().map(|c| c.city_id).collect();

    for product in &snow.products {
        if let Some(id) = product.category_id {
            assert!(category_ids.contains(&id));
        }
        if let Some(id) = product.brand_id {
            assert!(brand_ids.contains(&id));
        }
    }
    for city in &snow.cities {
        if let Some(id) = city.state_id {
            assert!(state_ids.contains(&id));
        }
    }
    for user in &snow.users {
        if let Some(id) = user.city_id {
            assert!(city_ids.contains(&id));
        }
    }

    // Parents are emitted before their children: every parent
    // reference points at an already-seen surrogate key.
    let mut seen = HashSet::new();
    for category in &snow.categories {
        if let Some(parent) = category.parent_category_id {
            assert!(seen.contains(&parent), "forward reference to {parent}");
        }
        seen.insert(category.category_id);
    }
}

#[test]
fn order_outside_date_range_aborts_run() {
    let config = config_2024();
    let mut snapshot = sample_snapshot(&config);

    snapshot.orders.push(Order {
        id: 9_999,
        user_id: 1,
        order_date: "2027-01-01T10:00:00".parse().unwrap(),
        status: OrderStatus::Pending,
        total: None,
    });
    snapshot.order_items.push(OrderItem {
        id: 99_999,
        order_id: 9_999,
        product_id: 1,
        quantity: 1,
        price: 10.0,
        discount_percentage: 0.0,
    });

    let err = transform::build_star(&snapshot, &config).unwrap_err();
    assert!(matches!(
        err,
        EtlError::DimensionLookup { dimension: "date", .. }
    ));
}

#[test]
fn fact_count_is_one_per_order_item() {
    let config = config_2024();
    let snapshot = sample_snapshot(&config);
    let star = transform::build_star(&snapshot, &config).unwrap();

    assert_eq!(star.facts.len(), snapshot.order_items.len());
}

#[test]
fn monthly_revenue_growth_is_defined() {
    let config = config_2024();
    let star = transform::build_star(&sample_snapshot(&config), &config).unwrap();

    let months = analytics::monthly_revenue(&star.facts);
    assert!(!months.is_empty());
    assert_eq!(months[0].growth_pct, None);
    for m in &months {
        assert!((1..=12).contains(&m.month));
        assert!(m.year == 2024);
        if let Some(g) = m.growth_pct {
            assert!(g.is_finite());
        }
    }
}

#[tokio::test]
async fn full_run_through_sink() {
    let config = config_2024();
    let snapshot = sample_snapshot(&config);

    assert!(validate::validate_snapshot(&snapshot).passed());

    let star = transform::build_star(&snapshot, &config).unwrap();
    let snow = transform::build_snowflake(&snapshot, &config).unwrap();

    let sink = InMemorySink::new();
    let star_report = sink.load_star(&star).await.unwrap();
    let snow_report = sink.load_snowflake(&snow).await.unwrap();

    assert_eq!(star_report.tables.len(), 5);
    assert_eq!(snow_report.tables.len(), 8);
    assert_eq!(sink.table_len("star_fact_orders"), star.facts.len());
    assert_eq!(sink.table_len("snow_dim_users"), snapshot.users.len());
}

#[test]
fn snapshot_roundtrips_through_directory() {
    let config = config_2024();
    let snapshot = sample_snapshot(&config);

    let dir = tempfile::tempdir().unwrap();
    snapshot.write_dir(dir.path()).unwrap();
    let reloaded = Snapshot::from_dir(dir.path()).unwrap();

    assert_eq!(reloaded.users.len(), snapshot.users.len());
    assert_eq!(reloaded.order_items.len(), snapshot.order_items.len());
    assert_eq!(
        reloaded.orders[0].order_date.date().year(),
        snapshot.orders[0].order_date.date().year()
    );

    let from_disk = transform::build_star(&reloaded, &config).unwrap();
    let from_memory = transform::build_star(&snapshot, &config).unwrap();
    assert_eq!(
        serde_json::to_string(&from_disk).unwrap(),
        serde_json::to_string(&from_memory).unwrap()
    );
}
