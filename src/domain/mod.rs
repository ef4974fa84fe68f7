//! Domain models - sign geometry, rules, panels and the final determination
//!
//! - `types` - boxes, OCR fragments, `Rule`, `Panel` and their enums
//! - `holiday` - red-day calendar
//! - `determination` - validated resolution output
//! - `error` - fatal engine errors

pub mod determination;
pub mod error;
pub mod holiday;
pub mod types;

pub use determination::{Determination, PaymentTerms};
pub use error::EngineError;
pub use holiday::{Holiday, HolidayCalendar};
pub use types::{BoundingBox, Cluster, OcrBlock, OcrLine, Panel, Rule, SignColor, SymbolKind, TimeUnit};
