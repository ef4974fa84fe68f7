//! Red-day list loader
//!
//! Reads a JSON array of `{"date": "yyyy-mm-dd", "name": "..."}` entries.
//! Entries whose date is not a valid ISO date are skipped with a warning;
//! valid ones are rewritten zero-padded.

use crate::domain::holiday::{Holiday, HolidayCalendar, ISO_DATE_FORMAT};
use anyhow::Context;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub fn parse_holidays(json: &str) -> anyhow::Result<Vec<Holiday>> {
    let entries: Vec<Holiday> = serde_json::from_str(json).context("Failed to parse holiday list")?;

    Ok(entries
        .into_iter()
        .filter_map(|h| match NaiveDate::parse_from_str(&h.date, ISO_DATE_FORMAT) {
            Ok(date) => Some(Holiday::new(date.format(ISO_DATE_FORMAT).to_string(), h.name)),
            Err(_) => {
                warn!(date = %h.date, name = %h.name, "holiday_date_invalid");
                None
            }
        })
        .collect())
}

pub fn load_holidays<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Holiday>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read holiday file {}", path.display()))?;
    parse_holidays(&content).with_context(|| format!("Invalid holiday file {}", path.display()))
}

/// Load the red-day list and build the shared calendar
pub fn load_calendar<P: AsRef<Path>>(path: P) -> anyhow::Result<HolidayCalendar> {
    let path = path.as_ref();
    let holidays = load_holidays(path)?;
    let calendar = HolidayCalendar::from_holidays(&holidays);
    info!(file = %path.display(), holidays = calendar.len(), "holiday_calendar_loaded");
    if calendar.is_empty() {
        warn!(file = %path.display(), "holiday_calendar_empty");
    }
    Ok(calendar)
}
