use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{EtlError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Externally supplied configuration for a transform run: the date
/// dimension bounds, the fiscal calendar, and the holiday set.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Month (1-12) the fiscal year starts in. 1 means fiscal = calendar.
    pub fiscal_year_start_month: u32,
    pub holidays: BTreeSet<NaiveDate>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            fiscal_year_start_month: 1,
            holidays: BTreeSet::new(),
        }
    }
}

/// On-disk TOML shape; dates are ISO strings so the file stays diffable.
#[derive(Debug, Deserialize)]
struct RawConfig {
    start_date: String,
    end_date: String,
    #[serde(default)]
    fiscal_year_start_month: Option<u32>,
    #[serde(default)]
    holidays: Vec<String>,
}

impl TransformConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let raw: RawConfig = toml::from_str(&content)?;

        let start_date = parse_date(&raw.start_date)?;
        let end_date = parse_date(&raw.end_date)?;

        let fiscal_year_start_month = raw.fiscal_year_start_month.unwrap_or(1);
        if !(1..=12).contains(&fiscal_year_start_month) {
            return Err(EtlError::Config(format!(
                "fiscal_year_start_month must be 1-12, got {fiscal_year_start_month}"
            )));
        }

        let mut holidays = BTreeSet::new();
        for h in &raw.holidays {
            holidays.insert(parse_date(h)?);
        }

        Ok(Self {
            start_date,
            end_date,
            fiscal_year_start_month,
            holidays,
        })
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| EtlError::Config(format!("Invalid date '{s}': {e}")))
}
