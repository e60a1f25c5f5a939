//! Validation log for out-of-range durations
//!
//! Every worker can report an invalid duration, but the diagnostic
//! file has exactly one owner: a dedicated writer thread fed through a
//! channel. Workers hold cheap clonable handles and never touch the
//! file, so concurrent reports cannot interleave or truncate each
//! other's lines.

use chrono::Local;
use crossbeam::channel::{unbounded, Sender};
use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use std::thread::JoinHandle;

/// Clonable reporting handle handed to workers.
#[derive(Debug, Clone)]
pub struct ValidationHandle {
    tx: Sender<String>,
}

impl ValidationHandle {
    /// Queue one diagnostic line. Fire-and-forget: a closed or failed
    /// writer never blocks or fails row construction.
    pub fn invalid_duration(&self, duration_ms: i64, log_file: &Path, honeypot: &str, ip: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!(
            "[{timestamp}] INVALID DURATION: {duration_ms}ms | File: {} | Honeypot: {honeypot} | IP: {ip}",
            log_file.display()
        );
        let _ = self.tx.send(line);
    }

    /// A handle with no writer behind it; reports go nowhere. For
    /// callers that only need the accounting side of validation.
    pub fn disconnected() -> Self {
        let (tx, _rx) = unbounded();
        Self { tx }
    }
}

/// Dedicated writer that serializes every validation-log append.
pub struct ValidationLogger {
    tx: Sender<String>,
    writer: JoinHandle<()>,
}

impl ValidationLogger {
    /// Remove any previous run's log and spawn the writer thread. The
    /// file itself is created lazily on the first diagnostic line, so
    /// a clean run leaves no log behind.
    pub fn start(path: &Path) -> std::io::Result<Self> {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }

        let (tx, rx) = unbounded::<String>();
        let file_path = path.to_path_buf();
        let writer = std::thread::spawn(move || {
            let mut out: Option<BufWriter<std::fs::File>> = None;
            for line in rx {
                if out.is_none() {
                    match OpenOptions::new().create(true).append(true).open(&file_path) {
                        Ok(file) => out = Some(BufWriter::new(file)),
                        Err(err) => {
                            tracing::warn!(
                                path = %file_path.display(),
                                %err,
                                "cannot open validation log, dropping diagnostics"
                            );
                            return;
                        }
                    }
                }
                if let Some(w) = out.as_mut() {
                    let _ = writeln!(w, "{line}");
                }
            }
            if let Some(mut w) = out {
                let _ = w.flush();
            }
        });

        Ok(Self { tx, writer })
    }

    /// Hand out a reporting handle for a worker.
    pub fn handle(&self) -> ValidationHandle {
        ValidationHandle {
            tx: self.tx.clone(),
        }
    }

    /// Drain queued lines and flush before returning. All worker
    /// handles must be dropped first or the writer would wait forever.
    pub fn shutdown(self) {
        let ValidationLogger { tx, writer } = self;
        drop(tx);
        let _ = writer.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lines_written_in_order_and_flushed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("validation.log");

        let logger = ValidationLogger::start(&path).unwrap();
        let handle = logger.handle();
        handle.invalid_duration(700_000, Path::new("a.log"), "pot1", "10.0.0.1");
        handle.invalid_duration(-5, Path::new("b.log"), "N/A", "N/A");
        drop(handle);
        logger.shutdown();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("INVALID DURATION: 700000ms | File: a.log | Honeypot: pot1 | IP: 10.0.0.1"));
        assert!(lines[1].contains("INVALID DURATION: -5ms | File: b.log | Honeypot: N/A | IP: N/A"));
    }

    #[test]
    fn test_no_file_created_without_reports() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("validation.log");

        let logger = ValidationLogger::start(&path).unwrap();
        logger.shutdown();

        assert!(!path.exists());
    }

    #[test]
    fn test_previous_log_removed_on_start() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("validation.log");
        std::fs::write(&path, "stale line\n").unwrap();

        let logger = ValidationLogger::start(&path).unwrap();
        logger.shutdown();

        assert!(!path.exists());
    }

    #[test]
    fn test_concurrent_reports_never_interleave() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("validation.log");

        let logger = ValidationLogger::start(&path).unwrap();
        let mut threads = Vec::new();
        for t in 0..4 {
            let handle = logger.handle();
            threads.push(std::thread::spawn(move || {
                for i in 0..50 {
                    handle.invalid_duration(
                        900_000 + i,
                        Path::new(&format!("worker{t}.log")),
                        "pot",
                        "10.0.0.9",
                    );
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }
        logger.shutdown();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            assert!(line.starts_with('['));
            assert!(line.contains("INVALID DURATION:"));
            assert!(line.ends_with("IP: 10.0.0.9"));
        }
    }

    #[test]
    fn test_disconnected_handle_never_blocks() {
        let handle = ValidationHandle::disconnected();
        handle.invalid_duration(999_999, Path::new("x.log"), "pot", "ip");
    }
}
