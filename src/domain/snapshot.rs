use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::{Address, Category, Order, OrderItem, Product, User};
use crate::error::Result;

/// An immutable snapshot of the normalized (3NF) record store. All
/// transforms run over one snapshot; nothing mutates it in place.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub addresses: Vec<Address>,
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
}

impl Snapshot {
    /// Load a snapshot from a directory of per-table JSON files, the
    /// layout the normalization stage writes (`users.json`,
    /// `products.json`, ...). Missing files load as empty tables with a
    /// warning so partial snapshots remain usable.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let snapshot = Self {
            users: load_table(dir, "users.json")?,
            addresses: load_table(dir, "addresses.json")?,
            categories: load_table(dir, "categories.json")?,
            products: load_table(dir, "products.json")?,
            orders: load_table(dir, "orders.json")?,
            order_items: load_table(dir, "order_items.json")?,
        };

        info!(
            users = snapshot.users.len(),
            products = snapshot.products.len(),
            orders = snapshot.orders.len(),
            order_items = snapshot.order_items.len(),
            "Loaded snapshot from {}",
            dir.display()
        );

        Ok(snapshot)
    }

    /// Writes the snapshot back out as per-table JSON files, the
    /// inverse of [`Snapshot::from_dir`].
    pub fn write_dir(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        write_table(dir, "users.json", &self.users)?;
        write_table(dir, "addresses.json", &self.addresses)?;
        write_table(dir, "categories.json", &self.categories)?;
        write_table(dir, "products.json", &self.products)?;
        write_table(dir, "orders.json", &self.orders)?;
        write_table(dir, "order_items.json", &self.order_items)?;

        info!("Wrote snapshot to {}", dir.display());
        Ok(())
    }

    pub fn users_by_id(&self) -> HashMap<i64, &User> {
        self.users.iter().map(|u| (u.id, u)).collect()
    }

    pub fn addresses_by_id(&self) -> HashMap<i64, &Address> {
        self.addresses.iter().map(|a| (a.id, a)).collect()
    }

    pub fn categories_by_id(&self) -> HashMap<i64, &Category> {
        self.categories.iter().map(|c| (c.id, c)).collect()
    }

    pub fn products_by_id(&self) -> HashMap<i64, &Product> {
        self.products.iter().map(|p| (p.id, p)).collect()
    }

    /// Order items grouped by their owning order.
    pub fn items_by_order(&self) -> HashMap<i64, Vec<&OrderItem>> {
        let mut grouped: HashMap<i64, Vec<&OrderItem>> = HashMap::new();
        for item in &self.order_items {
            grouped.entry(item.order_id).or_default().push(item);
        }
        grouped
    }
}

fn write_table<T: serde::Serialize>(dir: &Path, filename: &str, rows: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(rows)?;
    fs::write(dir.join(filename), json)?;
    Ok(())
}

fn load_table<T: DeserializeOwned>(dir: &Path, filename: &str) -> Result<Vec<T>> {
    let path = dir.join(filename);

    if !path.exists() {
        warn!("Snapshot file not found, treating as empty: {}", path.display());
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&path)?;
    let records = serde_json::from_str(&content)?;
    Ok(records)
}
