//! Final legal determination for one image

use crate::domain::error::{EngineError, Result};
use serde::Serialize;

/// Fee terms attached to the determination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PaymentTerms {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_whole_day: Option<bool>,
    /// Hour at which the current permission window closes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_park_hour: Option<u32>,
}

impl PaymentTerms {
    pub fn new(paid_whole_day: Option<bool>, end_park_hour: Option<u32>) -> Result<Self> {
        if let Some(hour) = end_park_hour {
            if hour > 24 {
                return Err(EngineError::EndHourOutOfRange(hour));
            }
        }
        Ok(Self { paid_whole_day, end_park_hour })
    }
}

/// Output of a resolution call. Only constructible through [`Determination::new`],
/// which rejects out-of-range fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Determination {
    #[serde(skip_serializing_if = "Option::is_none")]
    free_parking: Option<bool>,
    current_time: String,
    allowed_to_park: bool,
    payment: PaymentTerms,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_minutes: Option<u32>,
}

impl Determination {
    pub fn new(
        free_parking: Option<bool>,
        current_time: impl Into<String>,
        allowed_to_park: bool,
        payment: PaymentTerms,
        allowed_minutes: Option<i64>,
    ) -> Result<Self> {
        let allowed_minutes = match allowed_minutes {
            None => None,
            Some(m) if m <= 0 => return Err(EngineError::NonPositiveDuration(m)),
            Some(m) => Some(u32::try_from(m).map_err(|_| EngineError::NonPositiveDuration(m))?),
        };

        Ok(Self {
            free_parking,
            current_time: current_time.into(),
            allowed_to_park,
            payment,
            allowed_minutes,
        })
    }

    pub fn free_parking(&self) -> Option<bool> {
        self.free_parking
    }

    /// Reference time as "HH:MM"
    pub fn current_time(&self) -> &str {
        &self.current_time
    }

    pub fn allowed_to_park(&self) -> bool {
        self.allowed_to_park
    }

    pub fn paid_whole_day(&self) -> Option<bool> {
        self.payment.paid_whole_day
    }

    pub fn end_park_hour(&self) -> Option<u32> {
        self.payment.end_park_hour
    }

    pub fn allowed_minutes(&self) -> Option<u32> {
        self.allowed_minutes
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
