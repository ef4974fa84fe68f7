//! Temporal applicability of day-restriction rules
//!
//! A rule applies when its day type matches the reference date and the
//! reference hour lies in `[start_hour, end_hour)`. Hours only; a window
//! closes exactly at the top of its end hour.

use crate::domain::error::{EngineError, Result};
use crate::domain::holiday::HolidayCalendar;
use crate::domain::types::{Rule, SymbolKind};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use tracing::trace;

/// Day classification of a reference date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayClass {
    pub is_holiday: bool,
    pub is_saturday: bool,
    pub is_sunday: bool,
    /// Monday through Friday
    pub is_weekday: bool,
    pub tomorrow_is_holiday: bool,
}

impl DayClass {
    pub fn of(date: NaiveDate, calendar: &HolidayCalendar) -> Self {
        let weekday = date.weekday();
        Self {
            is_holiday: calendar.is_holiday(date),
            is_saturday: weekday == Weekday::Sat,
            is_sunday: weekday == Weekday::Sun,
            is_weekday: weekday.number_from_monday() <= 5,
            tomorrow_is_holiday: calendar.is_holiday_tomorrow(date),
        }
    }

    /// Whether a rule of `kind` is in force on this day
    pub fn matches(&self, kind: SymbolKind) -> bool {
        match kind {
            SymbolKind::Weekday => self.is_weekday,
            SymbolKind::PreHoliday => self.is_saturday || self.tomorrow_is_holiday,
            SymbolKind::Holiday => self.is_holiday || self.is_sunday,
            _ => false,
        }
    }
}

/// Decide whether `rule` applies at `now`.
///
/// Non-day rules never apply. A day rule without both hour bounds is a
/// contract violation and fails regardless of the date.
pub fn applies_at(rule: &Rule, now: NaiveDateTime, calendar: &HolidayCalendar) -> Result<bool> {
    if !rule.kind.is_day_rule() {
        return Ok(false);
    }

    let (Some(start), Some(end)) = (rule.start_hour, rule.end_hour) else {
        return Err(EngineError::MissingHourBounds { kind: rule.kind, text: rule.text.clone() });
    };

    let day = DayClass::of(now.date(), calendar);
    if !day.matches(rule.kind) {
        trace!(kind = %rule.kind, date = %now.date(), "rule_day_mismatch");
        return Ok(false);
    }

    let hour = now.hour();
    let applies = (start..end).contains(&hour);
    trace!(kind = %rule.kind, start, end, hour, applies, "rule_hour_window_checked");
    Ok(applies)
}
