//! Shared types for sign interpretation

use serde::{Deserialize, Serialize};

/// Integer pixel rectangle as reported by the OCR collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl BoundingBox {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Area in square pixels, zero for degenerate boxes
    pub fn area(&self) -> i64 {
        i64::from(self.width().max(0)) * i64::from(self.height().max(0))
    }

    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.left + self.right) / 2.0,
            f64::from(self.top + self.bottom) / 2.0,
        )
    }

    /// Overlapping rectangle, None when the boxes do not intersect
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);
        if left < right && top < bottom {
            Some(BoundingBox { left, top, right, bottom })
        } else {
            None
        }
    }

    /// Smallest rectangle containing every box, None for an empty input
    pub fn enclosing<'a, I>(boxes: I) -> Option<BoundingBox>
    where
        I: IntoIterator<Item = &'a BoundingBox>,
    {
        boxes.into_iter().fold(None, |acc, b| {
            Some(match acc {
                None => *b,
                Some(a) => BoundingBox {
                    left: a.left.min(b.left),
                    top: a.top.min(b.top),
                    right: a.right.max(b.right),
                    bottom: a.bottom.max(b.bottom),
                },
            })
        })
    }
}

/// Closed taxonomy of sign statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Paid,
    Parking,
    Weekday,
    PreHoliday,
    Holiday,
    TimeRange,
    Unknown,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 7] = [
        SymbolKind::Paid,
        SymbolKind::Parking,
        SymbolKind::Weekday,
        SymbolKind::PreHoliday,
        SymbolKind::Holiday,
        SymbolKind::TimeRange,
        SymbolKind::Unknown,
    ];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Paid => "paid",
            SymbolKind::Parking => "parking",
            SymbolKind::Weekday => "weekday",
            SymbolKind::PreHoliday => "pre_holiday",
            SymbolKind::Holiday => "holiday",
            SymbolKind::TimeRange => "time_range",
            SymbolKind::Unknown => "unknown",
        }
    }

    /// Day-restriction kinds carry an hour window and go through the temporal evaluator
    #[inline]
    pub fn is_day_rule(&self) -> bool {
        matches!(self, SymbolKind::Weekday | SymbolKind::PreHoliday | SymbolKind::Holiday)
    }

    /// Position in [`SymbolKind::ALL`], used for per-kind counters
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            SymbolKind::Paid => 0,
            SymbolKind::Parking => 1,
            SymbolKind::Weekday => 2,
            SymbolKind::PreHoliday => 3,
            SymbolKind::Holiday => 4,
            SymbolKind::TimeRange => 5,
            SymbolKind::Unknown => 6,
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Duration unit of a maximum-stay sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Hour,
    Minute,
    Day,
}

impl TimeUnit {
    pub fn minutes_per_unit(&self) -> u32 {
        match self {
            TimeUnit::Minute => 1,
            TimeUnit::Hour => 60,
            TimeUnit::Day => 24 * 60,
        }
    }
}

/// Background color of a sign face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignColor {
    Blue,
    Yellow,
    #[default]
    Unknown,
}

/// One classified statement extracted from a single OCR line.
///
/// Day rules carry their window in `start_hour`/`end_hour`. Time-range rules
/// carry the declared quantity in both fields and the unit in `sub_unit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub text: String,
    pub kind: SymbolKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_hour: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_hour: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_unit: Option<TimeUnit>,
}

impl Rule {
    pub fn new(text: impl Into<String>, kind: SymbolKind) -> Self {
        Self { text: text.into(), kind, start_hour: None, end_hour: None, sub_unit: None }
    }

    pub fn with_hours(mut self, start: u32, end: u32) -> Self {
        self.start_hour = Some(start);
        self.end_hour = Some(end);
        self
    }

    pub fn with_unit(mut self, unit: TimeUnit) -> Self {
        self.sub_unit = Some(unit);
        self
    }

    /// Red ink painted over a weekday window turns it into a holiday window
    pub fn upgraded_for_red_ink(self, red_ink: bool) -> Self {
        if red_ink && self.kind == SymbolKind::Weekday {
            Self { kind: SymbolKind::Holiday, ..self }
        } else {
            self
        }
    }
}

/// One recognised text line with its box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    pub bounding_box: BoundingBox,
}

/// One OCR text block: the fragments the clusterer merges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrBlock {
    pub bounding_box: BoundingBox,
    pub lines: Vec<OcrLine>,
}

/// Merged group of OCR blocks before rules and color are attached
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub lines: Vec<OcrLine>,
    pub bounding_box: BoundingBox,
    pub combined_text: String,
}

/// One physical sign face
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub combined_text: String,
    pub color: SignColor,
    /// Reading order, top to bottom
    pub rules: Vec<Rule>,
    pub bounding_box: BoundingBox,
}

impl Panel {
    pub fn new(combined_text: impl Into<String>, color: SignColor, rules: Vec<Rule>) -> Self {
        Self {
            combined_text: combined_text.into(),
            color,
            rules,
            bounding_box: BoundingBox::new(0, 0, 0, 0),
        }
    }

    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = bounding_box;
        self
    }
}
