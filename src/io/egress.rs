//! Determination egress - writes resolved scans to file
//!
//! One JSON object per line (JSONL), appended to the file specified in
//! config. Failed scans are written too, with the error instead of a
//! determination.

use crate::domain::determination::Determination;
use crate::domain::error::EngineError;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};
use uuid::Uuid;

/// One egress line
#[derive(Debug, Clone, Serialize)]
pub struct DeterminationRecord {
    /// UUIDv7, time-ordered
    pub scan_id: String,
    /// Scan file or caller-supplied label
    pub source: String,
    pub evaluated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub determination: Option<Determination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeterminationRecord {
    pub fn resolved(source: impl Into<String>, now: NaiveDateTime, determination: Determination) -> Self {
        Self::new(source.into(), now, Some(determination), None)
    }

    pub fn failed(source: impl Into<String>, now: NaiveDateTime, error: &EngineError) -> Self {
        Self::new(source.into(), now, None, Some(error.to_string()))
    }

    fn new(
        source: String,
        now: NaiveDateTime,
        determination: Option<Determination>,
        error: Option<String>,
    ) -> Self {
        Self {
            scan_id: Uuid::now_v7().to_string(),
            source,
            evaluated_at: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
            determination,
            error,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Egress writer for determinations
pub struct Egress {
    file_path: String,
}

impl Egress {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "egress_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Write a record to the egress file.
    /// Returns true if successful, false otherwise
    pub fn write_record(&self, record: &DeterminationRecord) -> bool {
        match self.append_line(&record.to_json()) {
            Ok(()) => {
                info!(
                    scan_id = %record.scan_id,
                    source = %record.source,
                    resolved = record.determination.is_some(),
                    "determination_egressed"
                );
                true
            }
            Err(e) => {
                error!(scan_id = %record.scan_id, error = %e, "determination_egress_failed");
                false
            }
        }
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "egress_written");

        Ok(())
    }
}
