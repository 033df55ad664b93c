use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;
use crate::transform::{SnowflakeSchema, StarSchema};

/// Outcome of handing one schema to a sink: per-table record counts
/// and how long the write took.
#[derive(Debug, Clone)]
pub struct SinkReport {
    pub tables: Vec<(String, usize)>,
    pub elapsed: Duration,
}

impl SinkReport {
    pub fn total_records(&self) -> usize {
        self.tables.iter().map(|(_, n)| n).sum()
    }
}

/// Write boundary for fully-built schemas. The transform core hands a
/// complete in-memory schema to a sink exactly once per run; retry and
/// backoff belong to the sink implementation, not the core.
#[async_trait]
pub trait SchemaSink: Send + Sync {
    async fn load_star(&self, schema: &StarSchema) -> Result<SinkReport>;
    async fn load_snowflake(&self, schema: &SnowflakeSchema) -> Result<SinkReport>;
}

fn rows_to_values<T: Serialize>(rows: &[T]) -> Result<Vec<Value>> {
    rows.iter()
        .map(|r| serde_json::to_value(r).map_err(Into::into))
        .collect()
}

fn star_tables(schema: &StarSchema) -> Result<Vec<(String, Vec<Value>)>> {
    Ok(vec![
        ("star_dim_users".to_string(), rows_to_values(&schema.users)?),
        ("star_dim_products".to_string(), rows_to_values(&schema.products)?),
        ("star_dim_location".to_string(), rows_to_values(&schema.locations)?),
        ("star_dim_date".to_string(), rows_to_values(&schema.dates)?),
        ("star_fact_orders".to_string(), rows_to_values(&schema.facts)?),
    ])
}

fn snowflake_tables(schema: &SnowflakeSchema) -> Result<Vec<(String, Vec<Value>)>> {
    Ok(vec![
        ("snow_dim_categories".to_string(), rows_to_values(&schema.categories)?),
        ("snow_dim_brands".to_string(), rows_to_values(&schema.brands)?),
        ("snow_dim_states".to_string(), rows_to_values(&schema.states)?),
        ("snow_dim_cities".to_string(), rows_to_values(&schema.cities)?),
        ("snow_dim_users".to_string(), rows_to_values(&schema.users)?),
        ("snow_dim_products".to_string(), rows_to_values(&schema.products)?),
        ("snow_dim_date".to_string(), rows_to_values(&schema.dates)?),
        ("snow_fact_orders".to_string(), rows_to_values(&schema.facts)?),
    ])
}

/// In-memory sink for development and testing.
#[derive(Default)]
pub struct InMemorySink {
    tables: Arc<Mutex<HashMap<String, Vec<Value>>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_len(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    pub fn table(&self, table: &str) -> Option<Vec<Value>> {
        self.tables.lock().unwrap().get(table).cloned()
    }

    fn store(&self, tables: Vec<(String, Vec<Value>)>) -> SinkReport {
        let start = Instant::now();
        let mut counts = Vec::with_capacity(tables.len());
        let mut stored = self.tables.lock().unwrap();
        for (name, rows) in tables {
            counts.push((name.clone(), rows.len()));
            debug!("Stored {} rows into {}", rows.len(), name);
            stored.insert(name, rows);
        }
        SinkReport {
            tables: counts,
            elapsed: start.elapsed(),
        }
    }
}

#[async_trait]
impl SchemaSink for InMemorySink {
    async fn load_star(&self, schema: &StarSchema) -> Result<SinkReport> {
        Ok(self.store(star_tables(schema)?))
    }

    async fn load_snowflake(&self, schema: &SnowflakeSchema) -> Result<SinkReport> {
        Ok(self.store(snowflake_tables(schema)?))
    }
}

/// Sink writing one JSON file per table into a directory, the layout
/// downstream loaders pick up for bulk inserts.
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn write_tables(&self, tables: Vec<(String, Vec<Value>)>) -> Result<SinkReport> {
        let start = Instant::now();
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut counts = Vec::with_capacity(tables.len());
        for (name, rows) in tables {
            let path = self.dir.join(format!("{name}.json"));
            let json = serde_json::to_string_pretty(&rows)?;
            tokio::fs::write(&path, json).await?;
            info!("Wrote {} rows to {}", rows.len(), path.display());
            counts.push((name, rows.len()));
        }

        Ok(SinkReport {
            tables: counts,
            elapsed: start.elapsed(),
        })
    }
}

#[async_trait]
impl SchemaSink for JsonDirSink {
    async fn load_star(&self, schema: &StarSchema) -> Result<SinkReport> {
        self.write_tables(star_tables(schema)?).await
    }

    async fn load_snowflake(&self, schema: &SnowflakeSchema) -> Result<SinkReport> {
        self.write_tables(snowflake_tables(schema)?).await
    }
}
