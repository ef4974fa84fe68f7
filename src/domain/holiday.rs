//! Red-day calendar
//!
//! Loaded once at startup and shared read-only (`Arc<HolidayCalendar>`)
//! across every resolution.

use chrono::{Datelike, Days, NaiveDate};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// ISO date format used by the red-day list
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// A public holiday entry as supplied by the calendar loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    /// "yyyy-mm-dd"
    pub date: String,
    #[serde(default)]
    pub name: String,
}

impl Holiday {
    pub fn new(date: impl Into<String>, name: impl Into<String>) -> Self {
        Self { date: date.into(), name: name.into() }
    }
}

/// Immutable date lookup, queried by exact ISO string match
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    dates: FxHashSet<String>,
    years: FxHashSet<i32>,
}

impl HolidayCalendar {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Dates are stored zero-padded; entries that do not parse are dropped
    pub fn from_holidays<'a, I>(holidays: I) -> Self
    where
        I: IntoIterator<Item = &'a Holiday>,
    {
        let parsed: Vec<NaiveDate> = holidays
            .into_iter()
            .filter_map(|h| NaiveDate::parse_from_str(&h.date, ISO_DATE_FORMAT).ok())
            .collect();

        Self {
            dates: parsed.iter().map(|d| d.format(ISO_DATE_FORMAT).to_string()).collect(),
            years: parsed.iter().map(|d| d.year()).collect(),
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date.format(ISO_DATE_FORMAT).to_string())
    }

    /// True when the day after `date` is a red day
    pub fn is_holiday_tomorrow(&self, date: NaiveDate) -> bool {
        date.checked_add_days(Days::new(1)).is_some_and(|next| self.is_holiday(next))
    }

    /// True when the list has at least one red day in the year of `date`.
    /// A year without entries cannot tell holidays from ordinary days.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.years.contains(&date.year())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
