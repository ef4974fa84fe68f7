//! End-to-end data flow for one image
//!
//! OCR blocks -> clusters -> per-line rules (with red-ink upgrade) ->
//! panel color -> determination. OCR and pixel analysis stay outside; the
//! pipeline only sees their results through [`OcrBlock`] and [`PixelAnalyzer`].

use crate::domain::determination::Determination;
use crate::domain::error::{EngineError, Result};
use crate::domain::holiday::HolidayCalendar;
use crate::domain::types::{BoundingBox, Cluster, OcrBlock, Panel, SymbolKind};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::classifier::classify;
use crate::services::clusterer::Clusterer;
use crate::services::color::{ColorClassifier, ColorRatios};
use crate::services::resolver::Resolver;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Pixel-analysis collaborator
pub trait PixelAnalyzer {
    /// Blue and yellow pixel ratios inside `region`
    fn color_ratios(&self, region: &BoundingBox) -> ColorRatios;

    /// Red pixel ratio inside `region`
    fn red_ratio(&self, region: &BoundingBox) -> f64;
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub panels: Vec<Panel>,
    pub determination: Determination,
}

pub struct Pipeline {
    clusterer: Clusterer,
    colors: ColorClassifier,
    resolver: Resolver,
    metrics: Option<Arc<Metrics>>,
}

impl Pipeline {
    pub fn new(clusterer: Clusterer, colors: ColorClassifier, resolver: Resolver) -> Self {
        Self { clusterer, colors, resolver, metrics: None }
    }

    pub fn from_config(config: &Config, calendar: Arc<HolidayCalendar>) -> Self {
        Self::new(
            Clusterer::new(config.cluster_params()),
            ColorClassifier::new(config.color_thresholds()),
            Resolver::new(calendar),
        )
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn clusterer(&self) -> &Clusterer {
        &self.clusterer
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Cluster the blocks and turn every cluster into a classified panel
    pub fn build_panels<P: PixelAnalyzer>(&self, blocks: &[OcrBlock], pixels: &P) -> Vec<Panel> {
        let panels: Vec<Panel> =
            self.clusterer.cluster(blocks).into_iter().map(|c| self.build_panel(c, pixels)).collect();

        if let Some(metrics) = &self.metrics {
            metrics.record_panels(panels.len());
        }
        panels
    }

    fn build_panel<P: PixelAnalyzer>(&self, cluster: Cluster, pixels: &P) -> Panel {
        let rules = cluster
            .lines
            .iter()
            .map(|line| {
                let rule = classify(&line.text);
                let classified_kind = rule.kind;
                let red_ink = self.colors.has_red_ink(pixels.red_ratio(&line.bounding_box));
                let upgraded = rule.upgraded_for_red_ink(red_ink);

                if upgraded.kind != classified_kind {
                    debug!(text = %upgraded.text, "red_ink_upgrade");
                    if let Some(metrics) = &self.metrics {
                        metrics.record_red_ink_upgrade();
                    }
                }
                if let Some(metrics) = &self.metrics {
                    metrics.record_line_classified(upgraded.kind);
                }
                upgraded
            })
            .collect();

        let ratios = pixels.color_ratios(&cluster.bounding_box);
        let color = self.colors.panel_color(ratios);
        debug!(
            text = %cluster.combined_text,
            color = ?color,
            blue = ratios.blue,
            yellow = ratios.yellow,
            "panel_built"
        );

        Panel::new(cluster.combined_text, color, rules).with_bounding_box(cluster.bounding_box)
    }

    /// Run the whole flow for one image. An image without text, or whose
    /// resolution hits a contract violation, yields an error and no panels.
    pub fn run<P: PixelAnalyzer>(
        &self,
        blocks: &[OcrBlock],
        pixels: &P,
        now: NaiveDateTime,
    ) -> Result<PipelineOutcome> {
        let started = Instant::now();
        let result = self.run_inner(blocks, pixels, now);
        let latency_us = started.elapsed().as_micros() as u64;

        match &result {
            Ok(outcome) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_scan_resolved(outcome.determination.allowed_to_park(), latency_us);
                }
            }
            Err(e) => {
                warn!(error = %e, "no_sign_recognized");
                if let Some(metrics) = &self.metrics {
                    metrics.record_scan_failed(latency_us);
                }
            }
        }
        result
    }

    fn run_inner<P: PixelAnalyzer>(
        &self,
        blocks: &[OcrBlock],
        pixels: &P,
        now: NaiveDateTime,
    ) -> Result<PipelineOutcome> {
        if blocks.iter().all(|b| b.lines.is_empty()) {
            return Err(EngineError::NoSignRecognized);
        }

        let panels = self.build_panels(blocks, pixels);
        let recognised = panels.iter().flat_map(|p| &p.rules).any(|r| r.kind != SymbolKind::Unknown);
        if !recognised {
            return Err(EngineError::NoSignRecognized);
        }

        let determination = self.resolver.resolve(&panels, now)?;
        Ok(PipelineOutcome { panels, determination })
    }
}
