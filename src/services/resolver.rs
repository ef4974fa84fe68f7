//! Parking resolution engine
//!
//! Walks every panel and rule once, accumulating an [`EvaluationState`], then
//! applies the finalization overrides:
//!
//! 1. a restriction found anywhere revokes a permission window
//! 2. a declared maximum stay is capped by the time left before the
//!    permission window closes (wrapping past midnight)
//! 3. a whole-day fee with no restriction permits parking without a cap
//!
//! Only the first applying day rule is honoured per class; later day rules are
//! skipped once a restriction or a permission window has been found.

use crate::domain::determination::{Determination, PaymentTerms};
use crate::domain::error::{EngineError, Result};
use crate::domain::holiday::HolidayCalendar;
use crate::domain::types::{Panel, Rule, SignColor, SymbolKind, TimeUnit};
use crate::services::temporal::applies_at;
use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MINUTES_PER_DAY: u32 = 24 * 60;

lazy_static! {
    static ref DURATION_NUMBER: Regex = Regex::new(r"\d+").expect("duration pattern to compile");
}

#[derive(Debug, Default)]
struct EvaluationState {
    allowed_to_park: bool,
    time_based_parking: bool,
    restricted_parking: bool,
    paid_whole_day: Option<bool>,
    time_range_minutes: Option<u32>,
    time_unit: Option<TimeUnit>,
    end_park_hour: Option<u32>,
    free_parking: Option<bool>,
}

/// Turns classified panels into a [`Determination`]
#[derive(Debug, Clone)]
pub struct Resolver {
    calendar: Arc<HolidayCalendar>,
}

impl Resolver {
    pub fn new(calendar: Arc<HolidayCalendar>) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &HolidayCalendar {
        &self.calendar
    }

    /// Resolve the panels of one image at `now`. Fails as a whole on any
    /// contract violation; no partial determination is produced.
    pub fn resolve(&self, panels: &[Panel], now: NaiveDateTime) -> Result<Determination> {
        if !self.calendar.covers(now.date()) {
            warn!(year = now.year(), "holiday_calendar_year_not_covered");
        }

        let mut state = EvaluationState::default();

        for panel in panels {
            for rule in &panel.rules {
                self.apply_rule(rule, panel, panels.len(), now, &mut state)?;
            }
        }

        finalize(&mut state, now);

        let payment = PaymentTerms::new(state.paid_whole_day, state.end_park_hour)?;
        let determination = Determination::new(
            state.free_parking,
            current_time_label(now),
            state.allowed_to_park,
            payment,
            state.time_range_minutes.map(i64::from),
        )?;

        info!(
            panels = panels.len(),
            allowed = determination.allowed_to_park(),
            restricted = state.restricted_parking,
            allowed_minutes = ?determination.allowed_minutes(),
            end_park_hour = ?determination.end_park_hour(),
            "parking_resolved"
        );

        Ok(determination)
    }

    fn apply_rule(
        &self,
        rule: &Rule,
        panel: &Panel,
        panel_count: usize,
        now: NaiveDateTime,
        state: &mut EvaluationState,
    ) -> Result<()> {
        match rule.kind {
            SymbolKind::Parking => {
                state.free_parking = free_parking(panel_count, now.weekday());
            }
            SymbolKind::Paid => {
                state.paid_whole_day = paid_whole_day(panel.rules.len());
            }
            SymbolKind::Weekday | SymbolKind::PreHoliday | SymbolKind::Holiday => {
                if panel.color == SignColor::Yellow {
                    if !state.restricted_parking {
                        state.restricted_parking = applies_at(rule, now, &self.calendar)?;
                        if state.restricted_parking {
                            debug!(text = %rule.text, kind = %rule.kind, "restriction_window_active");
                        }
                    }
                } else if !state.restricted_parking && !state.time_based_parking {
                    state.time_based_parking = applies_at(rule, now, &self.calendar)?;
                    if state.time_based_parking {
                        state.allowed_to_park = true;
                        state.end_park_hour = rule.end_hour;
                        debug!(text = %rule.text, end_hour = ?rule.end_hour, "permission_window_active");
                    }
                }
            }
            SymbolKind::TimeRange => {
                let amount = duration_number(&rule.text)?;
                let unit = rule
                    .sub_unit
                    .ok_or_else(|| EngineError::MissingTimeUnit { text: rule.text.clone() })?;
                state.time_range_minutes = Some(amount * unit.minutes_per_unit());
                state.time_unit = Some(unit);
            }
            SymbolKind::Unknown => {}
        }
        Ok(())
    }
}

fn finalize(state: &mut EvaluationState, now: NaiveDateTime) {
    if state.allowed_to_park && state.restricted_parking {
        state.allowed_to_park = false;
    }

    if let (Some(declared), Some(end_hour), Some(_)) =
        (state.time_range_minutes, state.end_park_hour, state.time_unit)
    {
        let remaining = minutes_until_hour(now, end_hour);
        let calibrated = declared.min(remaining);
        debug!(declared, remaining, calibrated, "time_range_calibrated");
        state.time_range_minutes = Some(calibrated);
    }

    if !state.allowed_to_park && state.paid_whole_day == Some(true) && !state.restricted_parking {
        state.allowed_to_park = true;
        state.time_range_minutes = None;
    }
}

/// Minutes from `now` until `end_hour`:00, wrapping to the next day when the
/// hour has already passed
pub fn minutes_until_hour(now: NaiveDateTime, end_hour: u32) -> u32 {
    let current = now.hour() * 60 + now.minute();
    let end = end_hour * 60;
    if end >= current {
        end - current
    } else {
        MINUTES_PER_DAY - current + end
    }
}

/// A lone "P" sign means free parking outside Monday to Thursday. With other
/// panels in the image the answer is left open.
pub fn free_parking(panel_count: usize, weekday: Weekday) -> Option<bool> {
    if panel_count != 1 {
        return None;
    }
    Some(!matches!(weekday, Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu))
}

/// A fee sign alone on its panel applies all day; qualified by other rules it does not
pub fn paid_whole_day(rules_on_panel: usize) -> Option<bool> {
    match rules_on_panel {
        0 => None,
        1 => Some(true),
        _ => Some(false),
    }
}

/// The single positive number on a maximum-stay sign
pub fn duration_number(text: &str) -> Result<u32> {
    let found: Vec<&str> = DURATION_NUMBER.find_iter(text).map(|m| m.as_str()).collect();

    if found.len() > 1 {
        let found = found.into_iter().map(str::to_string).collect();
        return Err(EngineError::MultipleDurationNumbers { text: text.to_string(), found });
    }

    let digits =
        found.first().ok_or_else(|| EngineError::NoDurationNumber { text: text.to_string() })?;
    match digits.parse::<u32>() {
        Err(_) => Err(EngineError::DurationOutOfRange { text: text.to_string() }),
        Ok(0) => Err(EngineError::ZeroDuration { text: text.to_string() }),
        Ok(n) => Ok(n),
    }
}

/// "HH:MM" label of the reference time
pub fn current_time_label(now: NaiveDateTime) -> String {
    format!("{:02}:{:02}", now.hour(), now.minute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::holiday::Holiday;
    use crate::services::classifier::classify;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    // Tue 2025-05-06
    fn tuesday(h: u32, min: u32) -> NaiveDateTime {
        at(2025, 5, 6, h, min)
    }

    fn resolver() -> Resolver {
        Resolver::new(Arc::new(HolidayCalendar::from_holidays(&[Holiday::new(
            "2025-05-29",
            "Kristi himmelsfärdsdag",
        )])))
    }

    fn panel(color: SignColor, lines: &[&str]) -> Panel {
        let rules = lines.iter().map(|l| classify(l)).collect();
        Panel::new(lines.join("\n"), color, rules)
    }

    #[test]
    fn test_blue_weekday_window_permits() {
        let d = resolver().resolve(&[panel(SignColor::Blue, &["8-18"])], tuesday(10, 0)).unwrap();
        assert!(d.allowed_to_park());
        assert_eq!(d.end_park_hour(), Some(18));
        assert_eq!(d.allowed_minutes(), None);
        assert_eq!(d.current_time(), "10:00");
    }

    #[test]
    fn test_blue_window_outside_hours() {
        let d = resolver().resolve(&[panel(SignColor::Blue, &["8-18"])], tuesday(19, 0)).unwrap();
        assert!(!d.allowed_to_park());
        assert_eq!(d.end_park_hour(), None);
    }

    #[test]
    fn test_time_range_capped_by_window() {
        let panels = [panel(SignColor::Blue, &["8-18", "2 tim"])];
        let d = resolver().resolve(&panels, tuesday(10, 0)).unwrap();
        assert!(d.allowed_to_park());
        assert_eq!(d.allowed_minutes(), Some(120));

        let d = resolver().resolve(&panels, tuesday(17, 15)).unwrap();
        assert_eq!(d.allowed_minutes(), Some(45));
    }

    #[test]
    fn test_time_range_without_window_is_declared_minutes() {
        let d = resolver().resolve(&[panel(SignColor::Blue, &["30 min"])], tuesday(10, 0)).unwrap();
        assert_eq!(d.allowed_minutes(), Some(30));
        assert!(!d.allowed_to_park());

        let d = resolver().resolve(&[panel(SignColor::Blue, &["1 dygn"])], tuesday(10, 0)).unwrap();
        assert_eq!(d.allowed_minutes(), Some(1440));
    }

    #[test]
    fn test_yellow_restriction_overrides_blue_permission() {
        let panels = [panel(SignColor::Blue, &["8-18"]), panel(SignColor::Yellow, &["8-18"])];
        let d = resolver().resolve(&panels, tuesday(10, 0)).unwrap();
        assert!(!d.allowed_to_park());
        // The permission window was recorded before the restriction was seen
        assert_eq!(d.end_park_hour(), Some(18));
    }

    #[test]
    fn test_restriction_first_blocks_later_permission() {
        let panels = [panel(SignColor::Yellow, &["8-18"]), panel(SignColor::Blue, &["8-18"])];
        let d = resolver().resolve(&panels, tuesday(10, 0)).unwrap();
        assert!(!d.allowed_to_park());
        assert_eq!(d.end_park_hour(), None);
    }

    #[test]
    fn test_first_applying_permission_wins() {
        let panels = [panel(SignColor::Blue, &["8-12", "8-18"])];
        let d = resolver().resolve(&panels, tuesday(10, 0)).unwrap();
        assert_eq!(d.end_park_hour(), Some(12));
    }

    #[test]
    fn test_non_applying_window_lets_next_one_through() {
        let panels = [panel(SignColor::Blue, &["(8-12)", "9-17"])];
        let d = resolver().resolve(&panels, tuesday(10, 0)).unwrap();
        assert!(d.allowed_to_park());
        assert_eq!(d.end_park_hour(), Some(17));
    }

    #[test]
    fn test_paid_whole_day() {
        let d = resolver().resolve(&[panel(SignColor::Blue, &["Avgift"])], tuesday(22, 0)).unwrap();
        assert!(d.allowed_to_park());
        assert_eq!(d.paid_whole_day(), Some(true));
        assert_eq!(d.allowed_minutes(), None);
    }

    #[test]
    fn test_paid_whole_day_drops_time_cap() {
        let panels = [panel(SignColor::Blue, &["Avgift"]), panel(SignColor::Blue, &["2 tim"])];
        let d = resolver().resolve(&panels, tuesday(22, 0)).unwrap();
        assert!(d.allowed_to_park());
        assert_eq!(d.allowed_minutes(), None);
    }

    #[test]
    fn test_qualified_fee_is_not_whole_day() {
        let d = resolver()
            .resolve(&[panel(SignColor::Blue, &["Avgift", "8-18"])], tuesday(20, 0))
            .unwrap();
        assert_eq!(d.paid_whole_day(), Some(false));
        assert!(!d.allowed_to_park());
    }

    #[test]
    fn test_paid_whole_day_blocked_by_restriction() {
        let panels = [panel(SignColor::Blue, &["Avgift"]), panel(SignColor::Yellow, &["8-18"])];
        let d = resolver().resolve(&panels, tuesday(10, 0)).unwrap();
        assert!(!d.allowed_to_park());
    }

    #[test]
    fn test_calibration_wraps_past_midnight() {
        assert_eq!(minutes_until_hour(tuesday(22, 0), 2), 240);
        assert_eq!(minutes_until_hour(tuesday(10, 0), 18), 480);
        assert_eq!(minutes_until_hour(tuesday(18, 0), 18), 0);
        assert_eq!(minutes_until_hour(tuesday(23, 30), 0), 30);
    }

    #[test]
    fn test_free_parking() {
        assert_eq!(free_parking(1, Weekday::Fri), Some(true));
        assert_eq!(free_parking(1, Weekday::Sun), Some(true));
        assert_eq!(free_parking(1, Weekday::Thu), Some(false));
        assert_eq!(free_parking(2, Weekday::Sat), None);

        // Sat 2025-05-03
        let d = resolver().resolve(&[panel(SignColor::Blue, &["P"])], at(2025, 5, 3, 12, 0)).unwrap();
        assert_eq!(d.free_parking(), Some(true));
    }

    #[test]
    fn test_holiday_rule_on_red_day() {
        let weekday_rule = classify("10-16").upgraded_for_red_ink(true);
        let panels = [Panel::new("10-16", SignColor::Blue, vec![weekday_rule])];
        // Ascension Thursday
        let d = resolver().resolve(&panels, at(2025, 5, 29, 11, 0)).unwrap();
        assert!(d.allowed_to_park());
        assert_eq!(d.end_park_hour(), Some(16));
    }

    #[test]
    fn test_duration_number() {
        assert_eq!(duration_number("2 tim"), Ok(2));
        assert_eq!(duration_number("24tim"), Ok(24));
        assert!(matches!(duration_number("tim"), Err(EngineError::NoDurationNumber { .. })));
        assert!(matches!(duration_number("0 tim"), Err(EngineError::ZeroDuration { .. })));
        assert!(matches!(
            duration_number("2 tim 8-18"),
            Err(EngineError::MultipleDurationNumbers { found, .. }) if found == ["2", "8", "18"]
        ));
    }

    #[test]
    fn test_duration_number_rejects_oversized_runs() {
        assert!(matches!(
            duration_number("99999999999 2 tim"),
            Err(EngineError::MultipleDurationNumbers { found, .. }) if found.len() == 2
        ));
        assert!(matches!(
            duration_number("99999999999 tim"),
            Err(EngineError::DurationOutOfRange { .. })
        ));
    }

    #[test]
    fn test_time_range_with_extra_numbers_fails_whole_resolution() {
        let rule = Rule::new("2 tim 8", SymbolKind::TimeRange).with_hours(2, 2).with_unit(TimeUnit::Hour);
        let panels = [Panel::new("2 tim 8", SignColor::Blue, vec![rule])];
        assert!(matches!(
            resolver().resolve(&panels, tuesday(10, 0)),
            Err(EngineError::MultipleDurationNumbers { .. })
        ));
    }

    #[test]
    fn test_time_range_without_unit_fails() {
        let rule = Rule::new("2 tim", SymbolKind::TimeRange).with_hours(2, 2);
        let panels = [Panel::new("2 tim", SignColor::Blue, vec![rule])];
        assert!(matches!(
            resolver().resolve(&panels, tuesday(10, 0)),
            Err(EngineError::MissingTimeUnit { .. })
        ));
    }

    #[test]
    fn test_malformed_day_rule_fails() {
        let panels = [Panel::new("8-", SignColor::Blue, vec![Rule::new("8-", SymbolKind::Weekday)])];
        assert!(matches!(
            resolver().resolve(&panels, tuesday(10, 0)),
            Err(EngineError::MissingHourBounds { .. })
        ));
    }

    #[test]
    fn test_window_ending_at_midnight() {
        // Window [8,24) closes at midnight
        let panels = [panel(SignColor::Blue, &["8-24", "2 tim"])];
        let d = resolver().resolve(&panels, tuesday(23, 30)).unwrap();
        assert_eq!(d.allowed_minutes(), Some(30));
    }

    #[test]
    fn test_current_time_label_is_zero_padded() {
        assert_eq!(current_time_label(tuesday(9, 5)), "09:05");
    }

    #[test]
    fn test_empty_panels() {
        let d = resolver().resolve(&[], tuesday(10, 0)).unwrap();
        assert!(!d.allowed_to_park());
        assert_eq!(d.free_parking(), None);
    }
}
