use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::geo::region_for_state;
use super::keys::SurrogateIndex;
use crate::domain::{Category, Snapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowCategoryRow {
    pub category_id: u32,
    pub name: String,
    pub slug: String,
    pub parent_category_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowBrandRow {
    pub brand_id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowStateRow {
    pub state_id: u32,
    pub name: String,
    pub code: String,
    pub region: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowCityRow {
    pub city_id: u32,
    pub name: String,
    pub state_id: Option<u32>,
}

/// Main user dimension; location attributes are replaced by a foreign
/// key into the city sub-dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowUserRow {
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
    pub city_id: Option<u32>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Main product dimension; category and brand become foreign keys into
/// their sub-dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowProductRow {
    pub product_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<u32>,
    pub brand_id: Option<u32>,
    pub sku: Option<String>,
    pub price: f64,
    pub discount_percentage: Option<f64>,
    pub rating: Option<f64>,
    pub stock: Option<i64>,
    pub weight: Option<f64>,
    pub warranty_info: Option<String>,
    pub availability_status: Option<String>,
}

/// Category sub-dimension output: emitted rows plus the natural-id
/// index the product builder resolves against.
pub struct CategoryDim {
    pub rows: Vec<SnowCategoryRow>,
    pub index: SurrogateIndex<i64>,
}

pub struct BrandDim {
    pub rows: Vec<SnowBrandRow>,
    pub index: SurrogateIndex<String>,
}

pub struct StateDim {
    pub rows: Vec<SnowStateRow>,
    pub index: SurrogateIndex<String>,
}

/// City sub-dimension keyed by (state_code, city).
pub struct CityDim {
    pub rows: Vec<SnowCityRow>,
    pub index: SurrogateIndex<(String, String)>,
}

/// Builds the category sub-dimension in dependency order: a category's
/// parent is always emitted (and keyed) before the category itself, so
/// `parent_category_id` never forward-references. A parent id that is
/// absent from the snapshot, or that closes a cycle, resolves to null.
pub fn build_category_dim(snapshot: &Snapshot) -> CategoryDim {
    let by_id: HashMap<i64, &Category> = snapshot.categories.iter().map(|c| (c.id, c)).collect();

    let mut ids: Vec<i64> = by_id.keys().copied().collect();
    ids.sort_unstable();

    let mut index = SurrogateIndex::new();
    let mut rows = Vec::new();
    let mut in_progress = HashSet::new();

    for id in ids {
        emit_category(id, &by_id, &mut index, &mut rows, &mut in_progress);
    }

    debug!(categories = rows.len(), "Built category sub-dimension");
    CategoryDim { rows, index }
}

fn emit_category(
    id: i64,
    by_id: &HashMap<i64, &Category>,
    index: &mut SurrogateIndex<i64>,
    rows: &mut Vec<SnowCategoryRow>,
    in_progress: &mut HashSet<i64>,
) {
    if index.get(&id).is_some() {
        return;
    }
    let Some(category) = by_id.get(&id) else {
        return;
    };

    // A parent chain that loops back is broken here; the offending
    // back-reference resolves to null instead of recursing forever.
    if !in_progress.insert(id) {
        warn!(category_id = id, "Cycle detected in category hierarchy");
        return;
    }

    let parent_category_id = match category.parent_id {
        Some(parent_id) => {
            emit_category(parent_id, by_id, index, rows, in_progress);
            let resolved = index.get(&parent_id);
            if resolved.is_none() && !by_id.contains_key(&parent_id) {
                warn!(
                    category_id = id,
                    parent_id, "Category references a parent absent from the snapshot"
                );
            }
            resolved
        }
        None => None,
    };

    in_progress.remove(&id);

    let category_id = index.get_or_insert(id);
    rows.push(SnowCategoryRow {
        category_id,
        name: category.name.clone(),
        slug: category.slug.clone(),
        parent_category_id,
    });
}

/// One row per distinct, non-empty brand, sorted by name.
pub fn build_brand_dim(snapshot: &Snapshot) -> BrandDim {
    let brands: BTreeSet<String> = snapshot
        .products
        .iter()
        .filter_map(|p| p.brand.clone())
        .filter(|b| !b.is_empty())
        .collect();

    let mut index = SurrogateIndex::new();
    let rows = brands
        .into_iter()
        .map(|name| SnowBrandRow {
            brand_id: index.get_or_insert(name.clone()),
            name,
        })
        .collect();

    BrandDim { rows, index }
}

/// One row per distinct state code observed in the addresses, sorted
/// by code. The state name comes from the lowest-id address carrying
/// that code so repeated runs agree.
pub fn build_state_dim(snapshot: &Snapshot) -> StateDim {
    let mut addresses: Vec<&crate::domain::Address> = snapshot.addresses.iter().collect();
    addresses.sort_by_key(|a| a.id);

    let mut states: BTreeMap<String, (String, String)> = BTreeMap::new();
    for addr in addresses {
        if addr.state_code.is_empty() {
            continue;
        }
        states
            .entry(addr.state_code.clone())
            .or_insert_with(|| (addr.state.clone(), addr.country.clone()));
    }

    let mut index = SurrogateIndex::new();
    let rows = states
        .into_iter()
        .map(|(code, (name, country))| SnowStateRow {
            state_id: index.get_or_insert(code.clone()),
            name,
            code: code.clone(),
            region: region_for_state(&code).to_string(),
            country,
        })
        .collect();

    StateDim { rows, index }
}

/// One row per distinct (city, state) pair, referencing the state's
/// surrogate key. A city whose state never made it into the state
/// sub-dimension keeps a null reference.
pub fn build_city_dim(snapshot: &Snapshot, states: &StateDim) -> CityDim {
    let pairs: BTreeSet<(String, String)> = snapshot
        .addresses
        .iter()
        .filter(|a| !a.city.is_empty())
        .map(|a| (a.state_code.clone(), a.city.clone()))
        .collect();

    let mut index = SurrogateIndex::new();
    let rows = pairs
        .into_iter()
        .map(|(state_code, city)| SnowCityRow {
            city_id: index.get_or_insert((state_code.clone(), city.clone())),
            name: city,
            state_id: states.index.get(&state_code),
        })
        .collect();

    CityDim { rows, index }
}

pub fn build_user_dim(snapshot: &Snapshot, cities: &CityDim) -> Vec<SnowUserRow> {
    let addresses = snapshot.addresses_by_id();

    let mut users: Vec<&crate::domain::User> = snapshot.users.iter().collect();
    users.sort_by_key(|u| u.id);

    users
        .into_iter()
        .map(|user| {
            let address = user.address_id.and_then(|id| addresses.get(&id));

            let city_id = address.and_then(|a| {
                cities
                    .index
                    .get(&(a.state_code.clone(), a.city.clone()))
            });

            SnowUserRow {
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
                city_id,
                postal_code: address.map(|a| a.postal_code.clone()),
                latitude: address.and_then(|a| a.latitude),
                longitude: address.and_then(|a| a.longitude),
            }
        })
        .collect()
}

pub fn build_product_dim(
    snapshot: &Snapshot,
    categories: &CategoryDim,
    brands: &BrandDim,
) -> Vec<SnowProductRow> {
    let mut products: Vec<&crate::domain::Product> = snapshot.products.iter().collect();
    products.sort_by_key(|p| p.id);

    products
        .into_iter()
        .map(|product| SnowProductRow {
            product_id: product.id,
            title: product.title.clone(),
            description: product.description.clone(),
            category_id: product.category_id.and_then(|id| categories.index.get(&id)),
            brand_id: product
                .brand
                .as_ref()
                .and_then(|b| brands.index.get(b)),
            sku: product.sku.clone(),
            price: product.price,
            discount_percentage: product.discount_percentage,
            rating: product.rating,
            stock: product.stock,
            weight: product.weight,
            warranty_info: product.warranty_info.clone(),
            availability_status: product.availability_status.clone(),
        })
        .collect()
}
