//! Fatal conditions surfaced to callers
//!
//! Classification never fails; anything here aborts resolution of the whole
//! image and should be presented as "no sign recognized".

use crate::domain::types::SymbolKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{kind} rule {text:?} reached the temporal evaluator without both hour bounds")]
    MissingHourBounds { kind: SymbolKind, text: String },

    #[error("time range {text:?} has no duration unit")]
    MissingTimeUnit { text: String },

    #[error("{token:?} is not a duration unit")]
    UnknownTimeUnit { token: String },

    #[error("no number found in time range {text:?}")]
    NoDurationNumber { text: String },

    #[error("more than one number found in time range {text:?}: {found:?}")]
    MultipleDurationNumbers { text: String, found: Vec<String> },

    #[error("duration in time range {text:?} is too large")]
    DurationOutOfRange { text: String },

    #[error("time range {text:?} declares zero duration")]
    ZeroDuration { text: String },

    #[error("end park hour {0} is outside 0..=24")]
    EndHourOutOfRange(u32),

    #[error("allowed minutes must be positive, got {0}")]
    NonPositiveDuration(i64),

    #[error("no sign recognized")]
    NoSignRecognized,
}

pub type Result<T> = std::result::Result<T, EngineError>;
