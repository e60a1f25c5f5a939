//! Transcript time correlation
//!
//! Each session log may have a sibling transcript recording raw
//! terminal I/O. The only thing extracted from it is the gap between
//! the attacker connecting and the last observed command, in
//! milliseconds. A missing or mangled transcript degrades the metric
//! to zero, never the pipeline.

use chrono::NaiveDateTime;
use std::path::Path;

/// Line marker written when the attacker session opens.
const CONNECT_MARKER: &str = "Attacker connected:";

/// Line markers written when a command is observed, in either
/// interactive or noninteractive mode.
const COMMAND_MARKERS: [&str; 2] = ["line from reader:", "Noninteractive mode attacker command:"];

/// Milliseconds from the connection marker to the last command marker
/// in the transcript at `path`. Returns 0 on any unresolvable
/// condition: missing file, missing markers, unparsable timestamps.
pub fn time_to_last_command_ms(path: &Path) -> u64 {
    let Ok(bytes) = std::fs::read(path) else {
        return 0;
    };
    // Transcripts contain raw attacker terminal bytes; decode lossily.
    elapsed_ms(&String::from_utf8_lossy(&bytes))
}

/// Marker scan over already-read transcript text.
pub fn elapsed_ms(transcript: &str) -> u64 {
    let connect = transcript
        .lines()
        .find(|line| line.contains(CONNECT_MARKER))
        .and_then(line_timestamp_ms);
    let Some(connect) = connect else {
        return 0;
    };

    let last_command = transcript
        .lines()
        .filter(|line| COMMAND_MARKERS.iter().any(|marker| line.contains(marker)))
        .last()
        .and_then(line_timestamp_ms);
    let Some(last_command) = last_command else {
        return 0;
    };

    (last_command - connect).max(0) as u64
}

/// Parse the leading `YYYY-MM-DD HH:MM:SS.FRAC` token pair of a
/// transcript line into absolute milliseconds. The fractional suffix
/// is an integer millisecond offset; a line without one is rejected.
fn line_timestamp_ms(line: &str) -> Option<i64> {
    let mut fields = line.split_whitespace();
    let date = fields.next()?;
    let time = fields.next()?;

    let (clock, fraction) = time.split_once('.')?;
    let datetime =
        NaiveDateTime::parse_from_str(&format!("{date} {clock}"), "%Y-%m-%d %H:%M:%S").ok()?;
    let millis: i64 = fraction.parse().ok()?;

    Some(datetime.and_utc().timestamp_millis() + millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = "\
2024-03-01 12:00:00.100 Attacker connected: 203.0.113.7
2024-03-01 12:00:01.000 line from reader: ls -la
2024-03-01 12:00:02.250 line from reader: cat /etc/passwd
2024-03-01 12:00:03.500 session closed
";

    #[test]
    fn test_elapsed_between_connect_and_last_command() {
        assert_eq!(elapsed_ms(TRANSCRIPT), 2150);
    }

    #[test]
    fn test_noninteractive_marker_counts() {
        let transcript = "\
2024-03-01 12:00:00.0 Attacker connected: 203.0.113.7
2024-03-01 12:00:05.42 Noninteractive mode attacker command: uname -a
";
        assert_eq!(elapsed_ms(transcript), 5042);
    }

    #[test]
    fn test_missing_connect_marker_yields_zero() {
        let transcript = "2024-03-01 12:00:01.000 line from reader: ls\n";
        assert_eq!(elapsed_ms(transcript), 0);
    }

    #[test]
    fn test_missing_command_marker_yields_zero() {
        let transcript = "2024-03-01 12:00:00.000 Attacker connected: 203.0.113.7\n";
        assert_eq!(elapsed_ms(transcript), 0);
    }

    #[test]
    fn test_command_before_connect_clamps_to_zero() {
        let transcript = "\
2024-03-01 12:00:10.000 Attacker connected: 203.0.113.7
2024-03-01 12:00:05.000 line from reader: ls
";
        assert_eq!(elapsed_ms(transcript), 0);
    }

    #[test]
    fn test_timestamp_without_fraction_rejected() {
        let transcript = "\
2024-03-01 12:00:00 Attacker connected: 203.0.113.7
2024-03-01 12:00:05.000 line from reader: ls
";
        // The connect timestamp has no fractional part, so the whole
        // metric is unresolvable.
        assert_eq!(elapsed_ms(transcript), 0);
    }

    #[test]
    fn test_garbage_timestamp_yields_zero() {
        let transcript = "\
not-a-date 99:99 Attacker connected: 203.0.113.7
2024-03-01 12:00:05.000 line from reader: ls
";
        assert_eq!(elapsed_ms(transcript), 0);
    }

    #[test]
    fn test_empty_transcript_yields_zero() {
        assert_eq!(elapsed_ms(""), 0);
    }

    #[test]
    fn test_missing_file_yields_zero() {
        assert_eq!(
            time_to_last_command_ms(Path::new("/nonexistent/session.out")),
            0
        );
    }

    #[test]
    fn test_fraction_parsed_as_integer_offset() {
        // `.5` is five milliseconds, not half a second: the fraction
        // is read as a literal integer count.
        let transcript = "\
2024-03-01 12:00:00.0 Attacker connected: x
2024-03-01 12:00:01.5 line from reader: ls
";
        assert_eq!(elapsed_ms(transcript), 1005);
    }
}
