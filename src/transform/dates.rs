use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::TransformConfig;
use crate::error::{EtlError, Result};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// One row of the calendar dimension. The surrogate key is the
/// `YYYYMMDD` encoding of the date, so it is stable without any
/// allocation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRow {
    pub date_id: u32,
    pub full_date: NaiveDate,
    pub year: i32,
    pub quarter: u32,
    pub month: u32,
    pub month_name: String,
    pub day: u32,
    /// 1 = Monday ... 7 = Sunday.
    pub day_of_week: u32,
    pub day_name: String,
    pub week_of_year: u32,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub fiscal_year: i32,
    pub fiscal_quarter: u32,
}

/// Pluggable holiday determination for the calendar dimension.
pub trait HolidayCalendar: Send + Sync {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

/// Holiday calendar backed by an explicit date set. Empty by default.
#[derive(Debug, Clone, Default)]
pub struct FixedHolidays(pub BTreeSet<NaiveDate>);

impl HolidayCalendar for FixedHolidays {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }
}

/// Generator for the calendar dimension over an inclusive date range.
/// `rows()` is lazy and restartable; key lookups go through
/// [`DateDimension::date_id_for`].
pub struct DateDimension {
    start: NaiveDate,
    end: NaiveDate,
    fiscal_year_start_month: u32,
    holidays: Box<dyn HolidayCalendar>,
}

impl DateDimension {
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        fiscal_year_start_month: u32,
        holidays: Box<dyn HolidayCalendar>,
    ) -> Result<Self> {
        if start > end {
            return Err(EtlError::InvalidRange { start, end });
        }
        if !(1..=12).contains(&fiscal_year_start_month) {
            return Err(EtlError::Config(format!(
                "fiscal_year_start_month must be 1-12, got {fiscal_year_start_month}"
            )));
        }

        Ok(Self {
            start,
            end,
            fiscal_year_start_month,
            holidays,
        })
    }

    pub fn from_config(config: &TransformConfig) -> Result<Self> {
        Self::new(
            config.start_date,
            config.end_date,
            config.fiscal_year_start_month,
            Box::new(FixedHolidays(config.holidays.clone())),
        )
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// One row per calendar day in `[start, end]`, ascending. Calling
    /// this again restarts from the beginning.
    pub fn rows(&self) -> impl Iterator<Item = DateRow> + '_ {
        let end = self.end;
        self.start
            .iter_days()
            .take_while(move |d| *d <= end)
            .map(|d| self.row_for(d))
    }

    /// Resolves a date to its surrogate key. Dates outside the
    /// configured range are a hard error: they signal a mismatch
    /// between the source data and the configured bounds.
    pub fn date_id_for(&self, date: NaiveDate) -> Result<u32> {
        if date < self.start || date > self.end {
            return Err(EtlError::DimensionLookup {
                dimension: "date",
                key: date.to_string(),
            });
        }
        Ok(date_id(date))
    }

    fn row_for(&self, date: NaiveDate) -> DateRow {
        let weekday = date.weekday();
        let day_of_week = weekday.number_from_monday();

        DateRow {
            date_id: date_id(date),
            full_date: date,
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
            month: date.month(),
            month_name: MONTH_NAMES[date.month0() as usize].to_string(),
            day: date.day(),
            day_of_week,
            day_name: DAY_NAMES[day_of_week as usize - 1].to_string(),
            week_of_year: date.iso_week().week(),
            is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
            is_holiday: self.holidays.is_holiday(date),
            fiscal_year: fiscal_year(date, self.fiscal_year_start_month),
            fiscal_quarter: fiscal_quarter(date, self.fiscal_year_start_month),
        }
    }
}

/// Deterministic `YYYYMMDD` surrogate key for a calendar date.
pub fn date_id(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

fn fiscal_year(date: NaiveDate, start_month: u32) -> i32 {
    if start_month > 1 && date.month() >= start_month {
        date.year() + 1
    } else {
        date.year()
    }
}

fn fiscal_quarter(date: NaiveDate, start_month: u32) -> u32 {
    ((date.month() + 12 - start_month) % 12) / 3 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar(start: NaiveDate, end: NaiveDate) -> DateDimension {
        DateDimension::new(start, end, 1, Box::new(FixedHolidays::default())).unwrap()
    }

    #[test]
    fn test_row_count_matches_inclusive_range() {
        let dim = calendar(ymd(2024, 1, 1), ymd(2024, 12, 31));
        assert_eq!(dim.rows().count(), 366); // leap year

        let one_day = calendar(ymd(2024, 3, 5), ymd(2024, 3, 5));
        assert_eq!(one_day.rows().count(), 1);
    }

    #[test]
    fn test_rows_ascending_without_gaps() {
        let dim = calendar(ymd(2023, 2, 25), ymd(2023, 3, 3));
        let rows: Vec<DateRow> = dim.rows().collect();

        assert_eq!(rows.len(), 7);
        for pair in rows.windows(2) {
            assert_eq!(pair[1].full_date, pair[0].full_date.succ_opt().unwrap());
        }
    }

    #[test]
    fn test_restartable() {
        let dim = calendar(ymd(2022, 1, 1), ymd(2022, 1, 10));
        let first: Vec<DateRow> = dim.rows().collect();
        let second: Vec<DateRow> = dim.rows().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_range_rejected() {
        let result = DateDimension::new(
            ymd(2024, 1, 2),
            ymd(2024, 1, 1),
            1,
            Box::new(FixedHolidays::default()),
        );
        assert!(matches!(result, Err(EtlError::InvalidRange { .. })));
    }

    #[test]
    fn test_weekend_flags() {
        let dim = calendar(ymd(2024, 6, 3), ymd(2024, 6, 9)); // Mon..Sun
        let rows: Vec<DateRow> = dim.rows().collect();

        assert!(!rows[0].is_weekend); // Monday
        assert!(!rows[4].is_weekend); // Friday
        assert!(rows[5].is_weekend); // Saturday
        assert!(rows[6].is_weekend); // Sunday
        assert_eq!(rows[5].day_name, "Saturday");
        assert_eq!(rows[0].day_of_week, 1);
        assert_eq!(rows[6].day_of_week, 7);
    }

    #[test]
    fn test_date_id_encoding() {
        assert_eq!(date_id(ymd(2024, 6, 3)), 20_240_603);
        assert_eq!(date_id(ymd(2020, 12, 31)), 20_201_231);
    }

    #[test]
    fn test_date_id_for_out_of_range() {
        let dim = calendar(ymd(2020, 1, 1), ymd(2026, 12, 31));
        assert_eq!(dim.date_id_for(ymd(2024, 2, 29)).unwrap(), 20_240_229);

        let err = dim.date_id_for(ymd(2027, 1, 1)).unwrap_err();
        assert!(matches!(
            err,
            EtlError::DimensionLookup { dimension: "date", .. }
        ));
    }

    #[test]
    fn test_calendar_fiscal_year_is_default() {
        let dim = calendar(ymd(2024, 1, 1), ymd(2024, 12, 31));
        let rows: Vec<DateRow> = dim.rows().collect();

        assert!(rows.iter().all(|r| r.fiscal_year == 2024));
        assert_eq!(rows[0].fiscal_quarter, 1);
        assert_eq!(rows.last().unwrap().fiscal_quarter, 4);
    }

    #[test]
    fn test_october_fiscal_year() {
        let dim = DateDimension::new(
            ymd(2024, 1, 1),
            ymd(2024, 12, 31),
            10,
            Box::new(FixedHolidays::default()),
        )
        .unwrap();
        let rows: Vec<DateRow> = dim.rows().collect();

        let january = &rows[0];
        assert_eq!(january.fiscal_year, 2024);
        assert_eq!(january.fiscal_quarter, 2);

        let october = rows.iter().find(|r| r.month == 10 && r.day == 1).unwrap();
        assert_eq!(october.fiscal_year, 2025);
        assert_eq!(october.fiscal_quarter, 1);
    }

    #[test]
    fn test_holiday_predicate() {
        let mut holidays = BTreeSet::new();
        holidays.insert(ymd(2024, 12, 25));

        let dim = DateDimension::new(
            ymd(2024, 12, 24),
            ymd(2024, 12, 26),
            1,
            Box::new(FixedHolidays(holidays)),
        )
        .unwrap();
        let rows: Vec<DateRow> = dim.rows().collect();

        assert!(!rows[0].is_holiday);
        assert!(rows[1].is_holiday);
        assert!(!rows[2].is_holiday);
    }

    #[test]
    fn test_iso_week_number() {
        // 2021-01-01 is a Friday, ISO week 53 of 2020.
        let dim = calendar(ymd(2021, 1, 1), ymd(2021, 1, 4));
        let rows: Vec<DateRow> = dim.rows().collect();
        assert_eq!(rows[0].week_of_year, 53);
        assert_eq!(rows[3].week_of_year, 1); // Monday the 4th
    }
}
