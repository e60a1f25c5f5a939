//! Per-file processing
//!
//! One log file is one unit of work: transcript correlation, repair,
//! the parse ladder, then per-entry normalization. Nothing in here
//! propagates an error to the caller; every failure mode lands in the
//! returned stats.

use crate::correlate;
use crate::normalize::{self, NormalizeContext, NormalizedRow};
use crate::repair::RepairEngine;
use crate::stats::FileStats;
use crate::validation::ValidationHandle;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Everything a worker returns for one log file.
#[derive(Debug, Default)]
pub struct FileReport {
    pub rows: Vec<NormalizedRow>,
    pub stats: FileStats,
}

/// Converts a single session log into rows. One per worker thread.
pub struct FileProcessor {
    repair: RepairEngine,
}

impl FileProcessor {
    pub fn new() -> Self {
        Self {
            repair: RepairEngine::new(),
        }
    }

    /// Process one session log. Infallible by contract: unreadable or
    /// unparsable input degrades to counters on the returned stats.
    pub fn process(&self, log_path: &Path, validation: &ValidationHandle) -> FileReport {
        let mut report = FileReport::default();

        let elapsed_ms = correlate::time_to_last_command_ms(&transcript_path(log_path));

        let content = match std::fs::read(log_path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                report.stats.failed = 1;
                eprintln!("[WARNING] Error processing {}: {err}", log_path.display());
                tracing::warn!(path = %log_path.display(), %err, "unreadable log file");
                return report;
            }
        };

        if content.trim().is_empty() {
            return report;
        }

        let repaired = self.repair.repair(&content);
        let entries = parse_entries(&repaired);
        if entries.is_empty() {
            report.stats.failed = 1;
            return report;
        }

        let ctx = NormalizeContext {
            log_path,
            elapsed_ms,
            validation,
        };
        for entry in entries {
            match normalize::normalize_entry(entry, &ctx) {
                Ok((row, delta)) => {
                    report.rows.push(row);
                    report.stats.add(&delta);
                }
                Err(err) => {
                    report.stats.failed += 1;
                    tracing::debug!(path = %log_path.display(), %err, "skipped entry");
                }
            }
        }
        report
    }
}

impl Default for FileProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole-document parse first, with a lone object wrapped as a
/// one-element list; newline-delimited fallback second, silently
/// dropping lines that still fail.
fn parse_entries(text: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(list)) => list,
        Ok(single) => vec![single],
        Err(_) => text
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() {
                    None
                } else {
                    serde_json::from_str(line).ok()
                }
            })
            .collect(),
    }
}

/// The paired transcript sits next to the log with `.out` in place of
/// `.log`.
pub fn transcript_path(log_path: &Path) -> PathBuf {
    log_path.with_extension("out")
}
