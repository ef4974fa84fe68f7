//! Sign symbol classifier
//!
//! Maps one OCR line to exactly one [`Rule`]. Patterns are tried in a fixed
//! priority order and the first match wins:
//!
//! 1. fee keyword (`avgift`, `betala`, `betald`) -> `Paid`
//! 2. lone `P` glyph -> `Parking`
//! 3. parenthesised hour range `(8-13)` -> `PreHoliday`
//! 4. bare hour range `8-18` -> `Weekday`
//! 5. quantity plus unit `2 tim` -> `TimeRange`
//!
//! Unmatched text, and ranges whose numbers do not parse, become `Unknown`.

use crate::domain::error::{EngineError, Result};
use crate::domain::types::{Rule, SymbolKind, TimeUnit};
use crate::services::normalizer::{clean_hour_range, clean_line};
use lazy_static::lazy_static;
use regex::{Captures, Regex, RegexBuilder};
use tracing::{debug, warn};

struct SignPattern {
    kind: SymbolKind,
    regex: Regex,
    /// Reject matches directly preceded by `(`
    reject_after_paren: bool,
}

impl SignPattern {
    fn new(kind: SymbolKind, pattern: &str, case_insensitive: bool) -> Self {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .expect("sign pattern to compile");
        Self { kind, regex, reject_after_paren: false }
    }

    fn not_after_paren(mut self) -> Self {
        self.reject_after_paren = true;
        self
    }

    fn find<'h>(&self, line: &'h str) -> Option<Captures<'h>> {
        if !self.reject_after_paren {
            return self.regex.captures(line);
        }

        let mut start = 0;
        while start <= line.len() {
            let caps = self.regex.captures_at(line, start)?;
            let m = caps.get(0)?;
            if !line[..m.start()].ends_with('(') {
                return Some(caps);
            }
            // Retry from the next char boundary inside the rejected match
            start = m.start() + line[m.start()..].chars().next().map_or(1, char::len_utf8);
        }
        None
    }
}

lazy_static! {
    static ref SIGN_PATTERNS: [SignPattern; 5] = [
        SignPattern::new(SymbolKind::Paid, r"\b(avgift|betala|betald)\b", true),
        SignPattern::new(SymbolKind::Parking, r"^p$", true),
        SignPattern::new(
            SymbolKind::PreHoliday,
            r"\(\s*(\d{1,2}|[oO])\s*[–—-]\s*(\d{1,2}|[oO])\s*\)",
            false,
        ),
        SignPattern::new(
            SymbolKind::Weekday,
            r"\b([oO]?\d{1,2}|[oO])\s*[–—-]\s*([oO]?\d{1,2}|[oO])\b",
            false,
        )
        .not_after_paren(),
        SignPattern::new(SymbolKind::TimeRange, r"\b(\d{1,2})\s*(tim|dygn|min)\b", false),
    ];
}

/// Kinds in the order patterns are tried
pub fn pattern_priority() -> Vec<SymbolKind> {
    SIGN_PATTERNS.iter().map(|p| p.kind).collect()
}

/// Classify a raw OCR line. Never fails.
pub fn classify(line: &str) -> Rule {
    let cleaned = clean_line(line);

    for pattern in SIGN_PATTERNS.iter() {
        let Some(caps) = pattern.find(&cleaned) else {
            continue;
        };

        let rule = match pattern.kind {
            SymbolKind::Weekday | SymbolKind::PreHoliday | SymbolKind::Holiday => {
                hour_range_rule(pattern.kind, &cleaned, &caps)
            }
            SymbolKind::TimeRange => time_range_rule(&cleaned, &caps),
            kind => Rule::new(cleaned.clone(), kind),
        };

        debug!(text = %line, kind = %rule.kind, "line_classified");
        return rule;
    }

    debug!(text = %line, "line_unclassified");
    Rule::new(cleaned, SymbolKind::Unknown)
}

fn hour_range_rule(kind: SymbolKind, cleaned: &str, caps: &Captures<'_>) -> Rule {
    let start = caps.get(1).and_then(|m| parse_hour(m.as_str()));
    let end = caps.get(2).and_then(|m| parse_hour(m.as_str()));

    match (start, end) {
        (Some(start), Some(end)) => Rule::new(clean_hour_range(cleaned), kind).with_hours(start, end),
        _ => {
            debug!(text = %cleaned, kind = %kind, "hour_range_unparsable");
            Rule::new(cleaned, SymbolKind::Unknown)
        }
    }
}

fn time_range_rule(cleaned: &str, caps: &Captures<'_>) -> Rule {
    let amount = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()).filter(|n| *n > 0);
    let Some(amount) = amount else {
        debug!(text = %cleaned, "time_range_amount_invalid");
        return Rule::new(cleaned, SymbolKind::Unknown);
    };

    let rule = Rule::new(cleaned, SymbolKind::TimeRange).with_hours(amount, amount);
    match caps.get(2).map(|m| unit_for_token(m.as_str())) {
        Some(Ok(unit)) => rule.with_unit(unit),
        // Left without a unit; the resolver rejects it
        Some(Err(e)) => {
            warn!(text = %cleaned, error = %e, "time_range_unit_unresolved");
            rule
        }
        None => rule,
    }
}

/// OCR often reads a zero as the letter O
fn parse_hour(raw: &str) -> Option<u32> {
    raw.replace(['o', 'O'], "0").parse().ok()
}

/// Map a matched duration token to its unit
pub fn unit_for_token(token: &str) -> Result<TimeUnit> {
    match token.to_lowercase().as_str() {
        "tim" => Ok(TimeUnit::Hour),
        "min" => Ok(TimeUnit::Minute),
        "dygn" => Ok(TimeUnit::Day),
        _ => Err(EngineError::UnknownTimeUnit { token: token.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_range(line: &str, kind: SymbolKind, start: u32, end: u32) {
        let rule = classify(line);
        assert_eq!(rule.kind, kind, "kind for {line:?}");
        assert_eq!(rule.start_hour, Some(start), "start for {line:?}");
        assert_eq!(rule.end_hour, Some(end), "end for {line:?}");
    }

    #[test]
    fn test_pattern_priority_order() {
        assert_eq!(
            pattern_priority(),
            vec![
                SymbolKind::Paid,
                SymbolKind::Parking,
                SymbolKind::PreHoliday,
                SymbolKind::Weekday,
                SymbolKind::TimeRange,
            ]
        );
    }

    #[test]
    fn test_paid_keywords() {
        for line in ["avgift", "BETALA", "Betald", "Avgift 8-18"] {
            assert_eq!(classify(line).kind, SymbolKind::Paid, "{line}");
        }
    }

    #[test]
    fn test_paid_respects_word_boundary() {
        assert_eq!(classify("avgiftsfritt").kind, SymbolKind::Unknown);
    }

    #[test]
    fn test_parking_glyph() {
        assert_eq!(classify("p").kind, SymbolKind::Parking);
        assert_eq!(classify("P").kind, SymbolKind::Parking);
        assert_eq!(classify("parking").kind, SymbolKind::Unknown);
    }

    #[test]
    fn test_weekday_basic() {
        assert_range("1-5", SymbolKind::Weekday, 1, 5);
        assert_range("0-6", SymbolKind::Weekday, 0, 6);
        assert_range("15-20", SymbolKind::Weekday, 15, 20);
        assert_range("O8-23", SymbolKind::Weekday, 8, 23);
    }

    #[test]
    fn test_weekday_letter_o_variants() {
        assert_range("O7-18", SymbolKind::Weekday, 7, 18);
        assert_range("o7-18", SymbolKind::Weekday, 7, 18);
        assert_range("07-18", SymbolKind::Weekday, 7, 18);
        assert_range("O9-O17", SymbolKind::Weekday, 9, 17);
        assert_range("O-5", SymbolKind::Weekday, 0, 5);
        assert_range("1-o", SymbolKind::Weekday, 1, 0);
    }

    #[test]
    fn test_weekday_spacing_and_dash_glyphs() {
        assert_range("1 - 5", SymbolKind::Weekday, 1, 5);
        assert_range("2–6", SymbolKind::Weekday, 2, 6);
        assert_range("O7 – 18", SymbolKind::Weekday, 7, 18);
        assert_range("O7     –      18", SymbolKind::Weekday, 7, 18);
        assert_range("O7–18", SymbolKind::Weekday, 7, 18);
    }

    #[test]
    fn test_weekday_text_is_canonical() {
        assert_eq!(classify("O7 – 18").text, "07 - 18");
        assert_eq!(classify("o7-18").text, "07 - 18");
        assert_eq!(classify("8-18").text, "08 - 18");
    }

    #[test]
    fn test_parenthesised_range_is_pre_holiday() {
        assert_range("(1-5)", SymbolKind::PreHoliday, 1, 5);
        assert_range("( 12 – 18 )", SymbolKind::PreHoliday, 12, 18);
        assert_range("( 07 - 23 )", SymbolKind::PreHoliday, 7, 23);
        assert_range("[8-13]", SymbolKind::PreHoliday, 8, 13);
    }

    #[test]
    fn test_unclosed_paren_is_not_weekday() {
        assert_eq!(classify("(8-13").kind, SymbolKind::Unknown);
    }

    #[test]
    fn test_weekday_found_after_rejected_paren_match() {
        assert_range("(8-13 9-17", SymbolKind::Weekday, 9, 17);
    }

    #[test]
    fn test_time_range_units() {
        let rule = classify("2 tim");
        assert_eq!(rule.kind, SymbolKind::TimeRange);
        assert_eq!(rule.start_hour, Some(2));
        assert_eq!(rule.end_hour, Some(2));
        assert_eq!(rule.sub_unit, Some(TimeUnit::Hour));

        assert_eq!(classify("30 min").sub_unit, Some(TimeUnit::Minute));
        assert_eq!(classify("1 dygn").sub_unit, Some(TimeUnit::Day));
        assert_eq!(classify("24tim").sub_unit, Some(TimeUnit::Hour));
    }

    #[test]
    fn test_zero_time_range_degrades_to_unknown() {
        assert_eq!(classify("0 tim").kind, SymbolKind::Unknown);
    }

    #[test]
    fn test_pattern_priority_resolves_overlaps() {
        assert_eq!(classify("p 1-5").kind, SymbolKind::Weekday);
        assert_eq!(classify("Avgift 1-5 (2-4) 3 tim").kind, SymbolKind::Paid);
        assert_eq!(classify("Parkering 1-5 måndag-fredag").kind, SymbolKind::Weekday);
        assert_eq!(classify("(8-11) 2 tim").kind, SymbolKind::PreHoliday);
    }

    #[test]
    fn test_unknown_keeps_text() {
        let rule = classify("random text");
        assert_eq!(rule.kind, SymbolKind::Unknown);
        assert_eq!(rule.text, "random text");
        assert_eq!(classify("123abc").kind, SymbolKind::Unknown);
    }

    #[test]
    fn test_edge_cases() {
        assert_eq!(classify("X-Y").kind, SymbolKind::Unknown);
        assert_eq!(classify("1-").kind, SymbolKind::Unknown);
        assert_eq!(classify("").kind, SymbolKind::Unknown);
        assert_eq!(classify("   ").kind, SymbolKind::Unknown);
    }

    #[test]
    fn test_noise_is_cleaned_before_matching() {
        assert_range("8.-18", SymbolKind::Weekday, 8, 18);
        assert_eq!(classify("Avgift!").kind, SymbolKind::Paid);
    }

    #[test]
    fn test_unit_for_token() {
        assert_eq!(unit_for_token("tim"), Ok(TimeUnit::Hour));
        assert_eq!(unit_for_token("MIN"), Ok(TimeUnit::Minute));
        assert_eq!(unit_for_token("dygn"), Ok(TimeUnit::Day));
        assert!(matches!(unit_for_token("vecka"), Err(EngineError::UnknownTimeUnit { .. })));
    }
}
