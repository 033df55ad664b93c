pub mod dates;
pub mod fact;
pub mod geo;
pub mod keys;
pub mod snowflake;
pub mod star;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::TransformConfig;
use crate::domain::Snapshot;
use crate::error::Result;
use dates::{DateDimension, DateRow};
use fact::FactRow;

/// Full Star schema output of one transform run: flattened dimensions
/// plus the fact collection (mirrors the `star_*` table set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarSchema {
    pub users: Vec<star::StarUserRow>,
    pub products: Vec<star::StarProductRow>,
    pub locations: Vec<star::StarLocationRow>,
    pub dates: Vec<DateRow>,
    pub facts: Vec<FactRow>,
}

/// Full Snowflake schema output: sub-dimensions, main dimensions with
/// foreign-key chains, and the fact collection (mirrors `snow_*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowflakeSchema {
    pub categories: Vec<snowflake::SnowCategoryRow>,
    pub brands: Vec<snowflake::SnowBrandRow>,
    pub states: Vec<snowflake::SnowStateRow>,
    pub cities: Vec<snowflake::SnowCityRow>,
    pub users: Vec<snowflake::SnowUserRow>,
    pub products: Vec<snowflake::SnowProductRow>,
    pub dates: Vec<DateRow>,
    pub facts: Vec<FactRow>,
}

/// Builds the complete Star schema from a snapshot. Dimensions are
/// independent of each other; the fact builder runs last because it
/// looks surrogate keys up in them.
pub fn build_star(snapshot: &Snapshot, config: &TransformConfig) -> Result<StarSchema> {
    let dim = DateDimension::from_config(config)?;

    let users = star::build_user_dim(snapshot);
    let products = star::build_product_dim(snapshot);
    let locations = star::build_location_dim(snapshot);
    let dates: Vec<DateRow> = dim.rows().collect();

    let facts = fact::build_facts(snapshot, &dim, Some(&locations.by_user))?;

    info!(
        users = users.len(),
        products = products.len(),
        locations = locations.rows.len(),
        dates = dates.len(),
        facts = facts.len(),
        "Star schema built"
    );

    Ok(StarSchema {
        users,
        products,
        locations: locations.rows,
        dates,
        facts,
    })
}

/// Builds the complete Snowflake schema: sub-dimensions first, then the
/// main dimensions that reference them, then facts.
pub fn build_snowflake(snapshot: &Snapshot, config: &TransformConfig) -> Result<SnowflakeSchema> {
    let dim = DateDimension::from_config(config)?;

    let categories = snowflake::build_category_dim(snapshot);
    let brands = snowflake::build_brand_dim(snapshot);
    let states = snowflake::build_state_dim(snapshot);
    let cities = snowflake::build_city_dim(snapshot, &states);

    let users = snowflake::build_user_dim(snapshot, &cities);
    let products = snowflake::build_product_dim(snapshot, &categories, &brands);
    let dates: Vec<DateRow> = dim.rows().collect();

    let facts = fact::build_facts(snapshot, &dim, None)?;

    info!(
        categories = categories.rows.len(),
        brands = brands.rows.len(),
        states = states.rows.len(),
        cities = cities.rows.len(),
        users = users.len(),
        products = products.len(),
        facts = facts.len(),
        "Snowflake schema built"
    );

    Ok(SnowflakeSchema {
        categories: categories.rows,
        brands: brands.rows,
        states: states.rows,
        cities: cities.rows,
        users,
        products,
        dates,
        facts,
    })
}
