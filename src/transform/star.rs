use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::geo::region_for_state;
use super::keys::SurrogateIndex;
use crate::domain::Snapshot;

/// Denormalized user dimension row. The natural user id doubles as the
/// surrogate key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarUserRow {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub blood_group: Option<String>,
    pub university: Option<String>,
    pub role: String,
}

/// Denormalized product dimension row; category and brand are copied
/// inline instead of referenced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarProductRow {
    pub product_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub price: f64,
    pub discount_percentage: Option<f64>,
    pub rating: Option<f64>,
    pub stock: Option<i64>,
    pub weight: Option<f64>,
    pub warranty_info: Option<String>,
    pub availability_status: Option<String>,
}

/// Location dimension row keyed by the distinct
/// (city, state, postal_code) combination, not per source address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarLocationRow {
    pub location_id: u32,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub state_code: String,
    pub postal_code: String,
    pub country: String,
    pub region: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Natural key of the location dimension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocationKey {
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// Location dimension output: the rows plus a user-id lookup the fact
/// builder uses to resolve `location_id`.
#[derive(Debug, Clone, Default)]
pub struct LocationLookup {
    pub rows: Vec<StarLocationRow>,
    pub by_user: HashMap<i64, u32>,
}

/// One row per user, all descriptive attributes flattened.
pub fn build_user_dim(snapshot: &Snapshot) -> Vec<StarUserRow> {
    let mut users: Vec<&crate::domain::User> = snapshot.users.iter().collect();
    users.sort_by_key(|u| u.id);

    users
        .into_iter()
        .map(|user| StarUserRow {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: format!("{} {}", user.first_name, user.last_name)
                .trim()
                .to_string(),
            age: user.age,
            gender: user.gender.clone(),
            phone: user.phone.clone(),
            birth_date: user.birth_date,
            blood_group: user.blood_group.clone(),
            university: user.university.clone(),
            role: user.role.clone(),
        })
        .collect()
}

/// One row per product with the category name resolved inline. A
/// product pointing at a category absent from the snapshot gets the
/// "Unknown" placeholder rather than failing the batch.
pub fn build_product_dim(snapshot: &Snapshot) -> Vec<StarProductRow> {
    let categories = snapshot.categories_by_id();

    let mut products: Vec<&crate::domain::Product> = snapshot.products.iter().collect();
    products.sort_by_key(|p| p.id);

    products
        .into_iter()
        .map(|product| {
            let category = product
                .category_id
                .and_then(|id| categories.get(&id))
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "Unknown".to_string());

            StarProductRow {
                product_id: product.id,
                title: product.title.clone(),
                description: product.description.clone(),
                category,
                brand: product.brand.clone(),
                sku: product.sku.clone(),
                price: product.price,
                discount_percentage: product.discount_percentage,
                rating: product.rating,
                stock: product.stock,
                weight: product.weight,
                warranty_info: product.warranty_info.clone(),
                availability_status: product.availability_status.clone(),
            }
        })
        .collect()
}

/// Builds the location dimension: one surrogate key per distinct
/// (city, state, postal_code) combination across all addresses, with a
/// user-id lookup for the fact builder. Addresses are walked in id
/// order so key assignment is reproducible.
pub fn build_location_dim(snapshot: &Snapshot) -> LocationLookup {
    let mut index: SurrogateIndex<LocationKey> = SurrogateIndex::new();
    let mut rows = Vec::new();

    let mut addresses: Vec<&crate::domain::Address> = snapshot.addresses.iter().collect();
    addresses.sort_by_key(|a| a.id);

    let mut by_address: HashMap<i64, u32> = HashMap::new();
    for addr in addresses {
        let key = LocationKey {
            city: addr.city.clone(),
            state: addr.state.clone(),
            postal_code: addr.postal_code.clone(),
        };

        let before = index.len();
        let location_id = index.get_or_insert(key);
        if index.len() > before {
            // First sighting of this combination defines the row.
            rows.push(StarLocationRow {
                location_id,
                address_line: addr.address_line.clone(),
                city: addr.city.clone(),
                state: addr.state.clone(),
                state_code: addr.state_code.clone(),
                postal_code: addr.postal_code.clone(),
                country: addr.country.clone(),
                region: region_for_state(&addr.state_code).to_string(),
                latitude: addr.latitude,
                longitude: addr.longitude,
            });
        }
        by_address.insert(addr.id, location_id);
    }

    let mut by_user = HashMap::new();
    for user in &snapshot.users {
        if let Some(location_id) = user.address_id.and_then(|id| by_address.get(&id)) {
            by_user.insert(user.id, *location_id);
        }
    }

    debug!(
        locations = rows.len(),
        users_resolved = by_user.len(),
        "Built location dimension"
    );

    LocationLookup { rows, by_user }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, Category, Product, User};

    fn user(id: i64, address_id: Option<i64>) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            first_name: "Test".to_string(),
            last_name: format!("User{id}"),
            age: Some(30),
            gender: None,
            phone: None,
            birth_date: None,
            blood_group: None,
            university: None,
            role: "user".to_string(),
            address_id,
        }
    }

    fn address(id: i64, city: &str, postal: &str) -> Address {
        Address {
            id,
            address_line: format!("{id} Main St"),
            city: city.to_string(),
            state: "Washington".to_string(),
            state_code: "WA".to_string(),
            postal_code: postal.to_string(),
            country: "United States".to_string(),
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn test_shared_location_combination_shares_key() {
        let snapshot = Snapshot {
            users: vec![user(1, Some(10)), user(2, Some(11)), user(3, Some(12))],
            addresses: vec![
                address(10, "Seattle", "98101"),
                address(11, "Seattle", "98101"),
                address(12, "Tacoma", "98402"),
            ],
            ..Default::default()
        };

        let lookup = build_location_dim(&snapshot);
        assert_eq!(lookup.rows.len(), 2);
        assert_eq!(lookup.by_user[&1], lookup.by_user[&2]);
        assert_ne!(lookup.by_user[&1], lookup.by_user[&3]);
        assert_eq!(lookup.rows[0].region, "West");
    }

    #[test]
    fn test_user_without_address_unresolved() {
        let snapshot = Snapshot {
            users: vec![user(1, None)],
            ..Default::default()
        };

        let lookup = build_location_dim(&snapshot);
        assert!(lookup.rows.is_empty());
        assert!(lookup.by_user.is_empty());
    }

    #[test]
    fn test_product_dim_flattens_category() {
        let snapshot = Snapshot {
            categories: vec![Category {
                id: 1,
                name: "Beauty".to_string(),
                slug: "beauty".to_string(),
                parent_id: None,
            }],
            products: vec![
                Product {
                    id: 1,
                    title: "Mascara".to_string(),
                    description: None,
                    category_id: Some(1),
                    brand: Some("Essence".to_string()),
                    sku: None,
                    price: 9.99,
                    discount_percentage: None,
                    rating: None,
                    stock: None,
                    weight: None,
                    warranty_info: None,
                    availability_status: None,
                },
                Product {
                    id: 2,
                    title: "Mystery item".to_string(),
                    description: None,
                    category_id: Some(999),
                    brand: None,
                    sku: None,
                    price: 1.0,
                    discount_percentage: None,
                    rating: None,
                    stock: None,
                    weight: None,
                    warranty_info: None,
                    availability_status: None,
                },
            ],
            ..Default::default()
        };

        let rows = build_product_dim(&snapshot);
        assert_eq!(rows[0].category, "Beauty");
        assert_eq!(rows[1].category, "Unknown");
    }

    #[test]
    fn test_user_dim_full_name() {
        let snapshot = Snapshot {
            users: vec![user(7, None)],
            ..Default::default()
        };

        let rows = build_user_dim(&snapshot);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, 7);
        assert_eq!(rows[0].full_name, "Test User7");
    }
}
