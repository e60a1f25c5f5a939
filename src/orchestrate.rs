//! Pipeline orchestration
//!
//! Discovers log files, fans them out across a bounded worker pool,
//! and fans the results back into a single-threaded merge. Workers
//! share nothing mutable; per-file stats come back by value and the
//! totals are only touched here.

use crate::csv_output::DatasetWriter;
use crate::process::{FileProcessor, FileReport};
use crate::stats::AggregateStats;
use crate::validation::ValidationLogger;
use anyhow::{Context, Result};
use crossbeam::channel;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

/// Hard ceiling on the worker pool.
const MAX_WORKERS: usize = 8;

/// Input files carry this suffix; the paired transcript swaps it for `.out`.
const LOG_SUFFIX: &str = ".log";

/// Everything `run` needs, resolved from the CLI.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub logs_dir: PathBuf,
    pub output: PathBuf,
    pub validation_log: PathBuf,
    pub jobs: Option<usize>,
}

/// Execute the full conversion. Returns the process exit code: 0 for
/// a normal (including empty) run, 1 when nothing converted and at
/// least one failure was recorded.
pub fn run(config: &RunConfig) -> Result<i32> {
    println!("[*] Honeypot JSON to CSV converter");
    println!("[*] ============================================================");
    println!("[*] Scanning for {LOG_SUFFIX} files in {}", config.logs_dir.display());

    let files = discover_log_files(&config.logs_dir);
    if files.is_empty() {
        println!("[*] No {LOG_SUFFIX} files found in {}", config.logs_dir.display());
        let writer = DatasetWriter::new();
        writer
            .write_to(&config.output)
            .with_context(|| format!("failed to write {}", config.output.display()))?;
        println!("[*] Output saved to: {}", config.output.display());
        return Ok(0);
    }

    let worker_count = worker_count(config.jobs);
    let mut stats = AggregateStats::default();

    println!("[*] Found {} log file(s)", files.len());
    println!("[*] Output file: {}", config.output.display());
    println!("[*] Using {worker_count} worker thread(s)");
    println!();
    println!("[*] Processing log files...");

    let validation = ValidationLogger::start(&config.validation_log).with_context(|| {
        format!(
            "failed to reset validation log {}",
            config.validation_log.display()
        )
    })?;

    let reports = run_workers(&files, worker_count, &validation);

    // Single-threaded fan-in, in enumeration order.
    let mut writer = DatasetWriter::new();
    for (index, report) in reports.into_iter().enumerate() {
        let name = files[index]
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| files[index].display().to_string());
        println!("[*] [{}/{}] Processed: {name}", index + 1, files.len());
        println!("    -> Converted {} entries", report.stats.entries);
        if report.stats.commands_split > 0 {
            println!(
                "    -> Split {} commands by semicolons",
                report.stats.commands_split
            );
        }
        stats.merge(&report.stats);
        writer.add_rows(report.rows);
    }

    validation.shutdown();

    println!();
    println!("[*] Writing CSV file...");
    writer
        .write_to(&config.output)
        .with_context(|| format!("failed to write {}", config.output.display()))?;

    print_summary(&stats, config);

    if writer.row_count() == 0 && stats.failed_entries > 0 {
        println!("[ERROR] No entries were successfully converted!");
        return Ok(1);
    }
    Ok(0)
}

/// Resolve the pool size: an explicit request is clamped into
/// `1..=MAX_WORKERS`, otherwise hardware parallelism capped at
/// `MAX_WORKERS`.
fn worker_count(requested: Option<usize>) -> usize {
    match requested {
        Some(n) => n.clamp(1, MAX_WORKERS),
        None => thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
            .min(MAX_WORKERS),
    }
}

/// Fan the files out over `worker_count` threads and collect one
/// report per file, indexed by enumeration order.
fn run_workers(
    files: &[PathBuf],
    worker_count: usize,
    validation: &ValidationLogger,
) -> Vec<FileReport> {
    let (task_tx, task_rx) = channel::unbounded::<(usize, PathBuf)>();
    let (result_tx, result_rx) = channel::unbounded::<(usize, FileReport)>();

    for (index, path) in files.iter().enumerate() {
        let _ = task_tx.send((index, path.clone()));
    }
    drop(task_tx);

    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let task_rx = task_rx.clone();
        let result_tx = result_tx.clone();
        let handle = validation.handle();
        handles.push(thread::spawn(move || {
            let processor = FileProcessor::new();
            for (index, path) in task_rx {
                let report = processor.process(&path, &handle);
                let _ = result_tx.send((index, report));
            }
        }));
    }
    drop(task_rx);
    drop(result_tx);

    let mut reports: Vec<FileReport> = (0..files.len()).map(|_| FileReport::default()).collect();
    for (index, report) in result_rx {
        reports[index] = report;
    }
    for handle in handles {
        let _ = handle.join();
    }
    reports
}

/// Recursively collect files under `root` ending in `.log`, sorted so
/// file order (and therefore per-file output grouping) is stable
/// across runs and pool sizes.
pub fn discover_log_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect_logs(root, &mut files);
    files.sort();
    files
}

fn collect_logs(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_logs(&path, files);
        } else if path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| name.ends_with(LOG_SUFFIX))
        {
            files.push(path);
        }
    }
}

fn print_summary(stats: &AggregateStats, config: &RunConfig) {
    println!();
    println!("[*] ============================================================");
    println!("[*] Conversion complete");
    println!("[*] ============================================================");
    println!("[*] Files processed: {}", stats.processed_files);
    println!("[*] Entries converted: {}", stats.total_entries);
    println!("[*] Failed entries: {}", stats.failed_entries);
    println!();
    println!("[*] Validation results:");
    println!("    -> Commands split by semicolons: {}", stats.commands_split);
    println!("    -> Duration errors found: {}", stats.duration_errors);
    println!(
        "    -> num_commands mismatches fixed: {}",
        stats.num_commands_fixed
    );
    if stats.duration_errors > 0 {
        println!(
            "    -> Duration errors logged to: {}",
            config.validation_log.display()
        );
    }
    println!();
    println!("[*] Output saved to: {}", config.output.display());
}
