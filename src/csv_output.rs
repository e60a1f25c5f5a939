//! CSV output for the normalized dataset
//!
//! Fixed 16-column schema with a mandatory header row. Fields
//! containing commas, quotes, or newlines are wrapped in quotes with
//! embedded quotes doubled; everything else is written verbatim.

use crate::normalize::NormalizedRow;
use std::path::Path;

/// Output columns, in contract order.
pub const COLUMNS: [&str; 16] = [
    "timestamp",
    "honeypot_name",
    "attacker_ip",
    "public_ip",
    "language",
    "login",
    "connect_time",
    "disconnect_time",
    "duration_ms",
    "num_commands",
    "commands",
    "avg_time_between_commands",
    "is_bot",
    "is_noninteractive",
    "disconnect_reason",
    "time_to_last_command_ms",
];

/// Accumulates rows and serializes the final dataset.
#[derive(Debug, Default)]
pub struct DatasetWriter {
    rows: Vec<NormalizedRow>,
}

impl DatasetWriter {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Append one file's rows, preserving their order.
    pub fn add_rows(&mut self, rows: Vec<NormalizedRow>) {
        self.rows.extend(rows);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn header() -> String {
        COLUMNS.join(",")
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_row(row: &NormalizedRow) -> String {
        row.fields()
            .iter()
            .map(|field| Self::escape_field(field))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Render the whole dataset, header first. A dataset with no rows
    /// still renders its header line.
    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(&Self::header());
        output.push('\n');
        for row in &self.rows {
            output.push_str(&Self::format_row(row));
            output.push('\n');
        }
        output
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_csv())
    }
}
