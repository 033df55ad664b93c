use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::domain::{
    Address, Category, Order, OrderItem, OrderStatus, Product, Snapshot, User,
};
use crate::transform::fact::round2;

/// Knobs for the sample snapshot generator. Same options, same output.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub seed: u64,
    pub users: usize,
    pub products: usize,
    pub orders: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            users: 50,
            products: 100,
            orders: 200,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        }
    }
}

const CITIES: [(&str, &str, &str, &str); 6] = [
    ("Seattle", "Washington", "WA", "98101"),
    ("Portland", "Oregon", "OR", "97201"),
    ("Austin", "Texas", "TX", "73301"),
    ("New York", "New York", "NY", "10001"),
    ("Miami", "Florida", "FL", "33101"),
    ("Chicago", "Illinois", "IL", "60601"),
];

const BRANDS: [&str; 5] = ["Acme", "Globex", "Initech", "Umbrella", "Stark"];

const FIRST_NAMES: [&str; 8] = [
    "Emily", "James", "Olivia", "Noah", "Sophia", "Liam", "Ava", "Mason",
];
const LAST_NAMES: [&str; 8] = [
    "Johnson", "Smith", "Brown", "Davis", "Wilson", "Miller", "Moore", "Taylor",
];

const STATUSES: [OrderStatus; 4] = [
    OrderStatus::Completed,
    OrderStatus::Pending,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
];

/// Generates a fully deterministic 3NF snapshot from a seed: a small
/// two-level category hierarchy, brands, addresses across a handful of
/// US cities, and orders dated inside the given range.
pub fn generate_snapshot(options: &GeneratorOptions) -> Snapshot {
    let mut rng = StdRng::seed_from_u64(options.seed);

    let categories = vec![
        Category { id: 1, name: "Electronics".to_string(), slug: "electronics".to_string(), parent_id: None },
        Category { id: 2, name: "Laptops".to_string(), slug: "laptops".to_string(), parent_id: Some(1) },
        Category { id: 3, name: "Smartphones".to_string(), slug: "smartphones".to_string(), parent_id: Some(1) },
        Category { id: 4, name: "Beauty".to_string(), slug: "beauty".to_string(), parent_id: None },
        Category { id: 5, name: "Fragrances".to_string(), slug: "fragrances".to_string(), parent_id: Some(4) },
        Category { id: 6, name: "Groceries".to_string(), slug: "groceries".to_string(), parent_id: None },
    ];

    let mut addresses = Vec::with_capacity(options.users);
    let mut users = Vec::with_capacity(options.users);
    for i in 1..=options.users as i64 {
        let (city, state, state_code, postal) = CITIES[rng.gen_range(0..CITIES.len())];
        addresses.push(Address {
            id: i,
            address_line: format!("{} Main St", 100 + i),
            city: city.to_string(),
            state: state.to_string(),
            state_code: state_code.to_string(),
            postal_code: postal.to_string(),
            country: "United States".to_string(),
            latitude: None,
            longitude: None,
        });

        let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
        let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
        users.push(User {
            id: i,
            username: format!("{}{}{}", first.to_lowercase(), last.to_lowercase(), i),
            email: format!("{}.{}.{}@example.com", first.to_lowercase(), last.to_lowercase(), i),
            first_name: first.to_string(),
            last_name: last.to_string(),
            age: Some(rng.gen_range(18..75)),
            gender: None,
            phone: None,
            birth_date: None,
            blood_group: None,
            university: None,
            role: "user".to_string(),
            address_id: Some(i),
        });
    }

    let mut products = Vec::with_capacity(options.products);
    for i in 1..=options.products as i64 {
        let category_id = categories[rng.gen_range(0..categories.len())].id;
        products.push(Product {
            id: i,
            title: format!("Product {i}"),
            description: None,
            category_id: Some(category_id),
            brand: Some(BRANDS[rng.gen_range(0..BRANDS.len())].to_string()),
            sku: Some(format!("SKU-{i:05}")),
            price: round2(rng.gen_range(1.0..500.0)),
            discount_percentage: None,
            rating: Some(round2(rng.gen_range(1.0..5.0))),
            stock: Some(rng.gen_range(0..200)),
            weight: None,
            warranty_info: None,
            availability_status: Some("In Stock".to_string()),
        });
    }

    let span_days = (options.end_date - options.start_date).num_days();
    let mut orders = Vec::with_capacity(options.orders);
    let mut order_items = Vec::new();
    let mut item_id = 1_i64;
    for i in 1..=options.orders as i64 {
        let date = options.start_date + chrono::Days::new(rng.gen_range(0..=span_days) as u64);
        // Business hours, like real order traffic
        let order_date = date
            .and_hms_opt(rng.gen_range(9..21), rng.gen_range(0..60), rng.gen_range(0..60))
            .unwrap();

        let user_id = rng.gen_range(1..=options.users as i64);
        let item_count = rng.gen_range(1..=4);

        let mut total = 0.0;
        for _ in 0..item_count {
            let product = &products[rng.gen_range(0..products.len())];
            let quantity = rng.gen_range(1..=5_u32);
            let discount = if rng.gen_bool(0.4) {
                round2(rng.gen_range(0.0..20.0))
            } else {
                0.0
            };
            total += quantity as f64 * product.price;

            order_items.push(OrderItem {
                id: item_id,
                order_id: i,
                product_id: product.id,
                quantity,
                price: product.price,
                discount_percentage: discount,
            });
            item_id += 1;
        }

        orders.push(Order {
            id: i,
            user_id,
            order_date,
            status: STATUSES[rng.gen_range(0..STATUSES.len())],
            total: Some(round2(total)),
        });
    }

    info!(
        users = users.len(),
        products = products.len(),
        orders = orders.len(),
        order_items = order_items.len(),
        "Generated sample snapshot"
    );

    Snapshot {
        users,
        addresses,
        categories,
        products,
        orders,
        order_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_snapshot() {
        let options = GeneratorOptions { users: 10, products: 10, orders: 10, ..Default::default() };
        let a = generate_snapshot(&options);
        let b = generate_snapshot(&options);

        assert_eq!(a.users.len(), b.users.len());
        assert_eq!(
            serde_json::to_string(&a.orders).unwrap(),
            serde_json::to_string(&b.orders).unwrap()
        );
    }

    #[test]
    fn test_references_are_valid() {
        let options = GeneratorOptions::default();
        let snapshot = generate_snapshot(&options);

        let users = snapshot.users_by_id();
        let products = snapshot.products_by_id();
        assert!(snapshot.orders.iter().all(|o| users.contains_key(&o.user_id)));
        assert!(snapshot
            .order_items
            .iter()
            .all(|i| products.contains_key(&i.product_id)));

        // Order dates stay inside the configured range
        assert!(snapshot.orders.iter().all(|o| {
            let d = o.order_date.date();
            d >= options.start_date && d <= options.end_date
        }));
    }
}
