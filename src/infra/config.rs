//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! Every section is optional; missing values fall back to the engine's
//! built-in constants.

use crate::services::clusterer::ClusterParams;
use crate::services::color::ColorThresholds;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/dev.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct HolidaysConfig {
    /// Red-day list, JSON array of `{date, name}`
    #[serde(default = "default_holidays_file")]
    pub file: String,
}

impl Default for HolidaysConfig {
    fn default() -> Self {
        Self { file: default_holidays_file() }
    }
}

fn default_holidays_file() -> String {
    "data/swedish_red_days.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default = "default_threshold_scale")]
    pub threshold_scale: f64,
    #[serde(default = "default_dense_factor")]
    pub dense_factor: f64,
    #[serde(default = "default_sparse_factor")]
    pub sparse_factor: f64,
    #[serde(default = "default_density_cutoff")]
    pub density_cutoff: f64,
    #[serde(default = "default_min_threshold")]
    pub min_threshold: f64,
    #[serde(default = "default_max_threshold")]
    pub max_threshold: f64,
    #[serde(default = "default_vertical_weight")]
    pub vertical_weight: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            threshold_scale: default_threshold_scale(),
            dense_factor: default_dense_factor(),
            sparse_factor: default_sparse_factor(),
            density_cutoff: default_density_cutoff(),
            min_threshold: default_min_threshold(),
            max_threshold: default_max_threshold(),
            vertical_weight: default_vertical_weight(),
        }
    }
}

fn default_threshold_scale() -> f64 {
    1.2
}

fn default_dense_factor() -> f64 {
    0.6
}

fn default_sparse_factor() -> f64 {
    0.8
}

fn default_density_cutoff() -> f64 {
    0.0001
}

fn default_min_threshold() -> f64 {
    20.0
}

fn default_max_threshold() -> f64 {
    200.0
}

fn default_vertical_weight() -> f64 {
    0.7
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorConfig {
    #[serde(default = "default_blue_threshold")]
    pub blue_threshold: f64,
    #[serde(default = "default_yellow_threshold")]
    pub yellow_threshold: f64,
    #[serde(default = "default_red_threshold")]
    pub red_threshold: f64,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            blue_threshold: default_blue_threshold(),
            yellow_threshold: default_yellow_threshold(),
            red_threshold: default_red_threshold(),
        }
    }
}

fn default_blue_threshold() -> f64 {
    0.2
}

fn default_yellow_threshold() -> f64 {
    0.2
}

fn default_red_threshold() -> f64 {
    0.01
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    /// File path for determination egress (JSONL format)
    #[serde(default = "default_egress_file")]
    pub file: String,
    #[serde(default = "default_egress_enabled")]
    pub enabled: bool,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self { file: default_egress_file(), enabled: default_egress_enabled() }
    }
}

fn default_egress_file() -> String {
    "determinations.jsonl".to_string()
}

fn default_egress_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Log a summary line after a batch of scans
    #[serde(default = "default_log_summary")]
    pub log_summary: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { log_summary: default_log_summary() }
    }
}

fn default_log_summary() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub holidays: HolidaysConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub color: ColorConfig,
    #[serde(default)]
    pub egress: EgressConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    config_file: String,
    holidays_file: String,
    cluster_params: ClusterParams,
    color_thresholds: ColorThresholds,
    egress_file: String,
    egress_enabled: bool,
    log_metrics_summary: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        let clustering = toml_config.clustering;
        let color = toml_config.color;

        Self {
            config_file,
            holidays_file: toml_config.holidays.file,
            cluster_params: ClusterParams {
                scale: clustering.threshold_scale,
                dense_factor: clustering.dense_factor,
                sparse_factor: clustering.sparse_factor,
                density_cutoff: clustering.density_cutoff,
                min_threshold: clustering.min_threshold,
                max_threshold: clustering.max_threshold,
                vertical_weight: clustering.vertical_weight,
            },
            color_thresholds: ColorThresholds {
                blue: color.blue_threshold,
                yellow: color.yellow_threshold,
                red: color.red_threshold,
            },
            egress_file: toml_config.egress.file,
            egress_enabled: toml_config.egress.enabled,
            log_metrics_summary: toml_config.metrics.log_summary,
        }
    }

    /// Explicit path wins, then CONFIG_FILE, then the dev default
    pub fn resolve_config_path(explicit: Option<&str>) -> String {
        if let Some(path) = explicit {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        DEFAULT_CONFIG_PATH.to_string()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load from `path`, falling back to defaults when it is missing or invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "config_fallback_to_defaults");
                Self::default()
            }
        }
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn holidays_file(&self) -> &str {
        &self.holidays_file
    }

    pub fn cluster_params(&self) -> ClusterParams {
        self.cluster_params
    }

    pub fn color_thresholds(&self) -> ColorThresholds {
        self.color_thresholds
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn egress_enabled(&self) -> bool {
        self.egress_enabled
    }

    pub fn log_metrics_summary(&self) -> bool {
        self.log_metrics_summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_constants() {
        let config = Config::default();
        assert_eq!(config.config_file(), "default");
        assert_eq!(config.cluster_params(), ClusterParams::default());
        assert_eq!(config.color_thresholds(), ColorThresholds::default());
        assert_eq!(config.holidays_file(), "data/swedish_red_days.json");
        assert!(config.egress_enabled());
        assert!(config.log_metrics_summary());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[clustering]
min_threshold = 30.0

[color]
red_threshold = 0.05
"#,
        )
        .unwrap();
        let config = Config::from_toml(toml_config, "inline".to_string());

        assert_eq!(config.cluster_params().min_threshold, 30.0);
        assert_eq!(config.cluster_params().max_threshold, 200.0);
        assert_eq!(config.color_thresholds().red, 0.05);
        assert_eq!(config.color_thresholds().blue, 0.2);
    }

    #[test]
    fn test_resolve_config_path_explicit() {
        assert_eq!(Config::resolve_config_path(Some("custom.toml")), "custom.toml");
    }
}
