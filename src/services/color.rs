//! Background color decisions from pixel ratios
//!
//! Pixel counting happens outside the engine; this module only owns the
//! thresholds that turn ratios into a sign color or a red-ink flag.

use crate::domain::types::SignColor;
use serde::Deserialize;

/// Fraction of panel pixels falling in the blue and yellow hue bands
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct ColorRatios {
    #[serde(default)]
    pub blue: f64,
    #[serde(default)]
    pub yellow: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorThresholds {
    pub blue: f64,
    pub yellow: f64,
    pub red: f64,
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self { blue: 0.2, yellow: 0.2, red: 0.01 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColorClassifier {
    thresholds: ColorThresholds,
}

impl ColorClassifier {
    pub fn new(thresholds: ColorThresholds) -> Self {
        Self { thresholds }
    }

    /// Blue wins over yellow when both clear their thresholds
    pub fn panel_color(&self, ratios: ColorRatios) -> SignColor {
        if ratios.blue > self.thresholds.blue {
            SignColor::Blue
        } else if ratios.yellow > self.thresholds.yellow {
            SignColor::Yellow
        } else {
            SignColor::Unknown
        }
    }

    /// Red paint over a line marks it as a holiday exception
    pub fn has_red_ink(&self, red_ratio: f64) -> bool {
        red_ratio > self.thresholds.red
    }
}
