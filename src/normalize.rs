//! Record normalization
//!
//! Maps one loosely-typed session entry onto the fixed 16-column row
//! shape: semicolon-split commands, a recomputed command count, a
//! range-checked duration, and lowercase text rendering of booleans.
//! Everything here is total apart from the not-an-object case, which
//! is the per-entry failure the file keeps counting past.

use crate::stats::FileStats;
use crate::validation::ValidationHandle;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// Accepted session duration range in milliseconds (up to 10 minutes).
pub const DURATION_MIN_MS: i64 = 0;
pub const DURATION_MAX_MS: i64 = 600_000;

/// Why a single entry could not be converted.
#[derive(Error, Debug)]
pub enum EntryError {
    #[error("entry is not a JSON object (got {0})")]
    NotAnObject(&'static str),
}

/// One session entry as the sensors wrote it: every field optional,
/// every type loose, unknown keys ignored. Absent keys decode to
/// `Value::Null` and fall back to empty-string output.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionEntry {
    pub timestamp: Value,
    pub honeypot_name: Value,
    pub attacker_ip: Value,
    pub public_ip: Value,
    pub language: Value,
    pub login: Value,
    pub connect_time: Value,
    pub disconnect_time: Value,
    pub duration_ms: Value,
    pub duration: Value,
    pub num_commands: Value,
    pub commands: Value,
    pub avg_time_between_commands: Value,
    pub is_bot: Value,
    pub is_noninteractive: Value,
    pub disconnect_reason: Value,
}

/// Canonical output record. All fields are already rendered as text,
/// matching the flat CSV contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub timestamp: String,
    pub honeypot_name: String,
    pub attacker_ip: String,
    pub public_ip: String,
    pub language: String,
    pub login: String,
    pub connect_time: String,
    pub disconnect_time: String,
    pub duration_ms: String,
    pub num_commands: String,
    pub commands: String,
    pub avg_time_between_commands: String,
    pub is_bot: String,
    pub is_noninteractive: String,
    pub disconnect_reason: String,
    pub time_to_last_command_ms: String,
}

impl NormalizedRow {
    /// Field values in output column order.
    pub fn fields(&self) -> [&str; 16] {
        [
            &self.timestamp,
            &self.honeypot_name,
            &self.attacker_ip,
            &self.public_ip,
            &self.language,
            &self.login,
            &self.connect_time,
            &self.disconnect_time,
            &self.duration_ms,
            &self.num_commands,
            &self.commands,
            &self.avg_time_between_commands,
            &self.is_bot,
            &self.is_noninteractive,
            &self.disconnect_reason,
            &self.time_to_last_command_ms,
        ]
    }
}

/// Per-file inputs shared by every entry in that file.
pub struct NormalizeContext<'a> {
    pub log_path: &'a Path,
    pub elapsed_ms: u64,
    pub validation: &'a ValidationHandle,
}

/// Convert one parsed entry into a row plus the stats delta it
/// produced. Side effect: an out-of-range duration queues one
/// validation-log line.
pub fn normalize_entry(
    raw: Value,
    ctx: &NormalizeContext,
) -> Result<(NormalizedRow, FileStats), EntryError> {
    if !raw.is_object() {
        return Err(EntryError::NotAnObject(json_type_name(&raw)));
    }
    // Every field is a defaulted Value, so object decoding cannot fail.
    let entry: SessionEntry = serde_json::from_value(raw).unwrap_or_default();

    let mut delta = FileStats::default();

    let commands = match entry.commands {
        Value::Array(ref list) => list.clone(),
        _ => Vec::new(),
    };
    let original_len = commands.len();
    let commands = split_commands(commands);
    let actual = commands.len();

    if actual != original_len {
        delta.commands_split += 1;
    }
    if !reported_count_matches(&entry.num_commands, actual) {
        delta.num_commands_fixed += 1;
    }

    let duration_ms = resolve_duration_ms(&entry);
    if !(DURATION_MIN_MS..=DURATION_MAX_MS).contains(&duration_ms) {
        delta.duration_errors += 1;
        ctx.validation.invalid_duration(
            duration_ms,
            ctx.log_path,
            &display_or_na(&entry.honeypot_name),
            &display_or_na(&entry.attacker_ip),
        );
    }

    let commands_json = match serde_json::to_string(&commands) {
        Ok(json) => json,
        Err(_) => "[]".to_string(),
    };

    let row = NormalizedRow {
        timestamp: field_text(&entry.timestamp),
        honeypot_name: field_text(&entry.honeypot_name),
        attacker_ip: field_text(&entry.attacker_ip),
        public_ip: field_text(&entry.public_ip),
        language: field_text(&entry.language),
        login: field_text(&entry.login),
        connect_time: field_text(&entry.connect_time),
        disconnect_time: field_text(&entry.disconnect_time),
        duration_ms: duration_ms.to_string(),
        num_commands: actual.to_string(),
        commands: commands_json,
        avg_time_between_commands: field_text(&entry.avg_time_between_commands),
        is_bot: field_text(&entry.is_bot).to_lowercase(),
        is_noninteractive: field_text(&entry.is_noninteractive).to_lowercase(),
        disconnect_reason: field_text(&entry.disconnect_reason),
        time_to_last_command_ms: ctx.elapsed_ms.to_string(),
    };

    delta.entries += 1;
    Ok((row, delta))
}

/// Split each string command on semicolons into trimmed, non-empty
/// parts, flattened in place with relative order preserved. Non-string
/// elements and strings without semicolons pass through.
pub fn split_commands(commands: Vec<Value>) -> Vec<Value> {
    let mut out = Vec::with_capacity(commands.len());
    for command in commands {
        match &command {
            Value::String(s) if s.contains(';') => {
                out.extend(
                    s.split(';')
                        .map(str::trim)
                        .filter(|part| !part.is_empty())
                        .map(|part| Value::String(part.to_string())),
                );
            }
            _ => out.push(command),
        }
    }
    out
}

/// The recomputed command count is authoritative; this only decides
/// whether the entry's own claim agreed with it. A missing field
/// claims zero; a non-numeric field never agrees.
fn reported_count_matches(reported: &Value, actual: usize) -> bool {
    match reported {
        Value::Null => actual == 0,
        Value::Number(n) => match n.as_i64() {
            Some(i) => i == actual as i64,
            None => n.as_f64() == Some(actual as f64),
        },
        _ => false,
    }
}

/// Pick the duration source: `duration_ms` unless it is falsy
/// (null, zero, empty, false), else the legacy `duration` field.
pub fn resolve_duration_ms(entry: &SessionEntry) -> i64 {
    let chosen = if is_falsy(&entry.duration_ms) {
        &entry.duration
    } else {
        &entry.duration_ms
    };
    coerce_ms(chosen)
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Permissive integer coercion: numbers truncate, integer strings
/// parse, booleans map to 0/1, anything else collapses to 0.
fn coerce_ms(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        Value::Bool(true) => 1,
        _ => 0,
    }
}

/// Render a loose field for a CSV cell: strings verbatim, scalars via
/// their JSON text, absent fields as the empty string.
fn field_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Same as `field_text` but with the `N/A` placeholder the validation
/// log uses for absent identity fields.
fn display_or_na(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
