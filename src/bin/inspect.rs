//! parksign-inspect - debug view of the sign pipeline
//!
//! Prints the intermediate results for one recorded scan: the merge
//! threshold, every reconstructed panel with its color and box, and for each
//! line the raw OCR text, the cleaned text and the classified rule. Ends with
//! the determination, or the reason none was produced.
//!
//! Usage:
//!   cargo run --bin parksign-inspect -- scans/kungsgatan.json
//!   cargo run --bin parksign-inspect -- --at 2025-05-03T09:00 scans/kungsgatan.json

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use clap::Parser;
use parksign::domain::{BoundingBox, Cluster, Panel, Rule};
use parksign::infra::Config;
use parksign::io::{load_calendar, parse_reference_time, read_scan, RecordedPixels};
use parksign::services::{PixelAnalyzer, Pipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "parksign-inspect")]
#[command(about = "Show clusters, cleaned lines and rules for a recorded scan")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Reference time for the determination
    #[arg(long, value_parser = parse_at)]
    at: Option<NaiveDateTime>,

    /// Recorded scan file (JSON)
    scan: PathBuf,
}

fn parse_at(raw: &str) -> Result<NaiveDateTime, String> {
    parse_reference_time(raw).map_err(|e| e.to_string())
}

fn format_box(b: &BoundingBox) -> String {
    format!("[{},{} {}x{}]", b.left, b.top, b.width(), b.height())
}

fn format_rule(rule: &Rule) -> String {
    let mut out = rule.kind.to_string();
    if let (Some(start), Some(end)) = (rule.start_hour, rule.end_hour) {
        out.push_str(&format!(" {start}-{end}"));
    }
    if let Some(unit) = rule.sub_unit {
        out.push_str(&format!(" {unit:?}").to_lowercase());
    }
    out
}

/// Raw OCR text, cleaned text and rule for each line of a panel
fn line_rows(cluster: &Cluster, panel: &Panel) -> Vec<String> {
    cluster
        .lines
        .iter()
        .zip(&panel.rules)
        .map(|(line, rule)| {
            let raw = line.text.escape_debug().to_string();
            format!("{:<18} | {:<18} | {}", raw, rule.text, format_rule(rule))
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load_from_path(Config::resolve_config_path(args.config.as_deref()));
    let calendar = Arc::new(load_calendar(config.holidays_file())?);
    let pipeline = Pipeline::from_config(&config, calendar);

    let scan = read_scan(&args.scan)?;
    let now = match args.at {
        Some(at) => at,
        None => scan
            .captured_at()
            .context("Invalid captured_at in scan")?
            .unwrap_or_else(|| Local::now().naive_local()),
    };

    let blocks = scan.ocr_blocks();
    let pixels = RecordedPixels::from_scan(&scan);
    let boxes: Vec<BoundingBox> = blocks.iter().map(|b| b.bounding_box).collect();

    println!("scan       {}", scan.id.as_deref().unwrap_or("-"));
    println!("reference  {}", now.format("%Y-%m-%d %H:%M (%A)"));
    println!("blocks     {} ({} lines)", blocks.len(), scan.line_count());
    println!("threshold  {:.1}px", pipeline.clusterer().adaptive_threshold(&boxes));
    println!(
        "calendar   today holiday={} tomorrow holiday={}",
        pipeline.resolver().calendar().is_holiday(now.date()),
        pipeline.resolver().calendar().is_holiday_tomorrow(now.date())
    );

    // Panels come out in cluster order, one rule per cluster line
    let clusters = pipeline.clusterer().cluster(&blocks);
    let panels = pipeline.build_panels(&blocks, &pixels);
    for (i, (cluster, panel)) in clusters.iter().zip(&panels).enumerate() {
        let ratios = pixels.color_ratios(&panel.bounding_box);
        println!();
        println!(
            "panel {} {:?} {} blue={:.2} yellow={:.2}",
            i + 1,
            panel.color,
            format_box(&panel.bounding_box),
            ratios.blue,
            ratios.yellow
        );
        for row in line_rows(cluster, panel) {
            println!("  {row}");
        }
    }

    println!();
    match pipeline.run(&blocks, &pixels, now) {
        Ok(outcome) => println!("{}", serde_json::to_string_pretty(&outcome.determination)?),
        Err(e) => println!("no sign recognized: {e}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parksign::domain::{OcrLine, SignColor};
    use parksign::services::classify;

    #[test]
    fn test_rows_pair_each_line_with_its_rule() {
        let bounding_box = BoundingBox::new(0, 0, 100, 30);
        let lines: Vec<OcrLine> = ["", "8-\n18", "2 tim"]
            .iter()
            .map(|text| OcrLine { text: text.to_string(), bounding_box })
            .collect();
        let rules = lines.iter().map(|l| classify(&l.text)).collect();
        let combined_text = lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>().join("\n");
        let cluster = Cluster { lines, bounding_box, combined_text: combined_text.clone() };
        let panel = Panel::new(combined_text, SignColor::Blue, rules);

        let rows = line_rows(&cluster, &panel);
        assert_eq!(rows.len(), 3);
        assert!(rows[1].starts_with("8-\\n18"));
        assert!(rows[2].starts_with("2 tim"));
        assert!(rows[2].ends_with("hour"));
    }
}
