//! Conversion statistics
//!
//! Per-file counters are produced inside each worker and returned by
//! value; the process-wide totals are only ever mutated during the
//! orchestrator's single-threaded fan-in. No counter is shared across
//! threads.

/// Counters for a single log file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    /// Entries successfully converted to rows
    pub entries: u64,
    /// Entries (or the whole file) that failed to convert
    pub failed: u64,
    /// Entries whose command list changed length after semicolon splitting
    pub commands_split: u64,
    /// Entries carrying a duration outside the accepted range
    pub duration_errors: u64,
    /// Entries whose self-reported num_commands disagreed with the list
    pub num_commands_fixed: u64,
}

impl FileStats {
    /// Fold a per-entry delta into this file's counters.
    pub fn add(&mut self, other: &FileStats) {
        self.entries += other.entries;
        self.failed += other.failed;
        self.commands_split += other.commands_split;
        self.duration_errors += other.duration_errors;
        self.num_commands_fixed += other.num_commands_fixed;
    }
}

/// Process-wide totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub processed_files: u64,
    pub total_entries: u64,
    pub failed_entries: u64,
    pub commands_split: u64,
    pub duration_errors: u64,
    pub num_commands_fixed: u64,
}

impl AggregateStats {
    /// Merge one completed file into the totals. Purely additive, so
    /// the result is independent of completion order.
    pub fn merge(&mut self, file: &FileStats) {
        self.processed_files += 1;
        self.total_entries += file.entries;
        self.failed_entries += file.failed;
        self.commands_split += file.commands_split;
        self.duration_errors += file.duration_errors;
        self.num_commands_fixed += file.num_commands_fixed;
    }
}
