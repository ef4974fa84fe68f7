//! IO modules - files in and out of the engine
//!
//! - `holidays` - red-day list loader (JSON)
//! - `scan` - recorded OCR and pixel-analysis captures (JSON)
//! - `egress` - determination output to file (JSONL format)

pub mod egress;
pub mod holidays;
pub mod scan;

// Re-export commonly used types
pub use egress::{DeterminationRecord, Egress};
pub use holidays::load_calendar;
pub use scan::{parse_reference_time, read_scan, RecordedPixels, Scan};
