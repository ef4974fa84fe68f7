//! parksign - resolve recorded parking-sign scans
//!
//! Reads one or more JSON scans (OCR blocks plus pixel ratios), runs the
//! sign pipeline on each and prints the determination.
//!
//! Module structure:
//! - `domain/` - Core types (Rule, Panel, Determination, HolidayCalendar)
//! - `services/` - Sign interpretation (classifier, clusterer, resolver)
//! - `io/` - Scans, red-day list, JSONL egress
//! - `infra/` - Config, Metrics
//!
//! Usage:
//!   parksign scans/kungsgatan.json
//!   parksign --at 2025-05-06T10:00 --config config/dev.toml scans/*.json

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use clap::Parser;
use parksign::domain::EngineError;
use parksign::infra::{Config, Metrics};
use parksign::io::{
    load_calendar, parse_reference_time, read_scan, DeterminationRecord, Egress, RecordedPixels,
};
use parksign::services::{Pipeline, PipelineOutcome};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// parksign - Swedish parking sign interpretation
#[derive(Parser, Debug)]
#[command(name = "parksign", version, about)]
struct Args {
    /// Path to TOML configuration file (default: CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Reference time, e.g. 2025-05-06T10:00 (default: scan capture time, else now)
    #[arg(long, value_parser = parse_at)]
    at: Option<NaiveDateTime>,

    /// Do not append determinations to the egress file
    #[arg(long)]
    no_egress: bool,

    /// Recorded scan files (JSON)
    #[arg(required = true)]
    scans: Vec<PathBuf>,
}

fn parse_at(raw: &str) -> Result<NaiveDateTime, String> {
    parse_reference_time(raw).map_err(|e| e.to_string())
}

struct ScanResult {
    source: String,
    evaluated_at: NaiveDateTime,
    outcome: Result<PipelineOutcome, EngineError>,
}

/// Runs on a blocking worker; the pipeline is pure CPU work
fn resolve_scan(pipeline: &Pipeline, path: PathBuf, at: Option<NaiveDateTime>) -> anyhow::Result<ScanResult> {
    let scan = read_scan(&path)?;
    let evaluated_at = match at {
        Some(at) => at,
        None => scan
            .captured_at()
            .with_context(|| format!("Invalid captured_at in {}", path.display()))?
            .unwrap_or_else(|| Local::now().naive_local()),
    };

    let source = scan.id.clone().unwrap_or_else(|| path.display().to_string());
    let pixels = RecordedPixels::from_scan(&scan);
    let outcome = pipeline.run(&scan.ocr_blocks(), &pixels, evaluated_at);

    Ok(ScanResult { source, evaluated_at, outcome })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: INFO, use RUST_LOG=debug for per-line classification
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    info!(version = env!("CARGO_PKG_VERSION"), git_hash = env!("GIT_HASH"), "parksign_starting");

    let config = Config::load_from_path(Config::resolve_config_path(args.config.as_deref()));
    info!(
        config_file = %config.config_file(),
        holidays_file = %config.holidays_file(),
        egress_file = %config.egress_file(),
        egress_enabled = %config.egress_enabled(),
        "config_loaded"
    );

    let calendar = Arc::new(load_calendar(config.holidays_file())?);
    let metrics = Arc::new(Metrics::new());
    let pipeline = Arc::new(Pipeline::from_config(&config, calendar).with_metrics(metrics.clone()));

    let egress = (config.egress_enabled() && !args.no_egress).then(|| Egress::new(config.egress_file()));

    // One blocking task per scan; results are reported in argument order
    let handles: Vec<_> = args
        .scans
        .into_iter()
        .map(|path| {
            let pipeline = pipeline.clone();
            let at = args.at;
            tokio::task::spawn_blocking(move || resolve_scan(&pipeline, path, at))
        })
        .collect();

    for handle in handles {
        let result = match handle.await.context("Scan worker panicked")? {
            Ok(result) => result,
            Err(e) => {
                error!(error = %format!("{e:#}"), "scan_unreadable");
                continue;
            }
        };

        let record = match result.outcome {
            Ok(outcome) => {
                let output = json!({
                    "source": result.source,
                    "panels": outcome.panels.len(),
                    "determination": outcome.determination,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
                DeterminationRecord::resolved(result.source, result.evaluated_at, outcome.determination)
            }
            Err(e) => {
                println!("{}: no sign recognized", result.source);
                DeterminationRecord::failed(result.source, result.evaluated_at, &e)
            }
        };

        if let Some(egress) = &egress {
            egress.write_record(&record);
        }
    }

    if config.log_metrics_summary() {
        metrics.report().log();
    }

    info!("parksign done");
    Ok(())
}
