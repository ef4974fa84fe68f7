//! Recorded scans - JSON captures of OCR and pixel-analysis output
//!
//! A scan stands in for the camera frame: blocks with their lines and boxes
//! as the OCR collaborator reported them, plus the color ratios the pixel
//! analyzer measured for each block and the red ratio for each line.

use crate::domain::types::{BoundingBox, OcrBlock, OcrLine};
use crate::services::color::ColorRatios;
use crate::services::pipeline::PixelAnalyzer;
use anyhow::Context;
use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Reference time formats accepted on the command line and in scans
const REFERENCE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

#[derive(Debug, Clone, Deserialize)]
pub struct ScanLine {
    pub text: String,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub red_ratio: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanBlock {
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub ratios: ColorRatios,
    #[serde(default)]
    pub lines: Vec<ScanLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scan {
    #[serde(default)]
    pub id: Option<String>,
    /// Capture time, used as reference time unless overridden
    #[serde(default)]
    pub captured_at: Option<String>,
    #[serde(default)]
    pub blocks: Vec<ScanBlock>,
}

impl Scan {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse scan JSON")
    }

    /// OCR view of the scan, dropping the pixel measurements
    pub fn ocr_blocks(&self) -> Vec<OcrBlock> {
        self.blocks
            .iter()
            .map(|block| OcrBlock {
                bounding_box: block.bounding_box,
                lines: block
                    .lines
                    .iter()
                    .map(|line| OcrLine { text: line.text.clone(), bounding_box: line.bounding_box })
                    .collect(),
            })
            .collect()
    }

    pub fn captured_at(&self) -> anyhow::Result<Option<NaiveDateTime>> {
        self.captured_at.as_deref().map(parse_reference_time).transpose()
    }

    pub fn line_count(&self) -> usize {
        self.blocks.iter().map(|b| b.lines.len()).sum()
    }
}

pub fn read_scan<P: AsRef<Path>>(path: P) -> anyhow::Result<Scan> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scan file {}", path.display()))?;
    let scan: Scan = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse scan file {}", path.display()))?;

    debug!(file = %path.display(), blocks = scan.blocks.len(), lines = scan.line_count(), "scan_loaded");
    Ok(scan)
}

/// Parse "YYYY-MM-DDTHH:MM[:SS]" or "YYYY-MM-DD HH:MM"
pub fn parse_reference_time(raw: &str) -> anyhow::Result<NaiveDateTime> {
    REFERENCE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
        .with_context(|| format!("Invalid reference time {raw:?}, expected YYYY-MM-DDTHH:MM"))
}

/// Pixel measurements replayed from a scan
#[derive(Debug, Clone, Default)]
pub struct RecordedPixels {
    blocks: Vec<(BoundingBox, ColorRatios)>,
    red_by_line: FxHashMap<BoundingBox, f64>,
}

impl RecordedPixels {
    pub fn from_scan(scan: &Scan) -> Self {
        let blocks = scan.blocks.iter().map(|b| (b.bounding_box, b.ratios)).collect();

        let mut red_by_line: FxHashMap<BoundingBox, f64> = FxHashMap::default();
        for line in scan.blocks.iter().flat_map(|b| &b.lines) {
            let entry = red_by_line.entry(line.bounding_box).or_insert(0.0);
            *entry = entry.max(line.red_ratio);
        }

        Self { blocks, red_by_line }
    }
}

impl PixelAnalyzer for RecordedPixels {
    /// Block ratios averaged by how much of each block falls inside `region`
    fn color_ratios(&self, region: &BoundingBox) -> ColorRatios {
        let mut weight = 0.0;
        let mut blue = 0.0;
        let mut yellow = 0.0;

        for (bounding_box, ratios) in &self.blocks {
            let Some(overlap) = bounding_box.intersection(region) else {
                continue;
            };
            let area = overlap.area() as f64;
            weight += area;
            blue += ratios.blue * area;
            yellow += ratios.yellow * area;
        }

        if weight == 0.0 {
            return ColorRatios::default();
        }
        ColorRatios { blue: blue / weight, yellow: yellow / weight }
    }

    fn red_ratio(&self, region: &BoundingBox) -> f64 {
        self.red_by_line.get(region).copied().unwrap_or(0.0)
    }
}
