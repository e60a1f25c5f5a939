//! Heuristic repair of near-JSON session logs
//!
//! The sensor processes write session records as JSON by hand, and the
//! output routinely carries trailing commas and unquoted elements in
//! the "commands" array. Repair is a pure text transform applied
//! before parsing: it accepts arbitrary input, never fails, and is
//! idempotent so already-clean documents pass through untouched.

use regex::Regex;

/// Text-level repair for malformed session logs.
///
/// Two fixes are applied, in order:
/// 1. trailing commas before a closing `]` or `}` are removed,
///    anywhere in the document;
/// 2. on every line carrying a `"commands":` array, the bracket
///    interior is re-tokenized and each element is normalized into a
///    properly quoted JSON string.
pub struct RepairEngine {
    trailing_comma: Regex,
    commands_array: Regex,
}

impl RepairEngine {
    pub fn new() -> Self {
        Self {
            trailing_comma: Regex::new(r",(\s*[\]}])").expect("trailing-comma pattern"),
            commands_array: Regex::new(r#""commands":\s*\[([^\]]*)\]"#)
                .expect("commands-array pattern"),
        }
    }

    /// Repair near-JSON text. Total over any input and idempotent:
    /// `repair(repair(x)) == repair(x)`.
    pub fn repair(&self, raw: &str) -> String {
        let stripped = self.strip_trailing_commas(raw);

        // Line-oriented pass so a malformed commands array cannot eat
        // the rest of the document.
        stripped
            .split('\n')
            .map(|line| self.fix_commands_line(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Remove commas that directly precede a closing bracket or brace.
    /// Runs to a fixpoint: `,,]` needs two passes.
    fn strip_trailing_commas(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        loop {
            let next = self.trailing_comma.replace_all(&text, "$1");
            if next == text {
                return text;
            }
            text = next.into_owned();
        }
    }

    /// Rebuild the first `"commands": [...]` span on this line, if any.
    /// The bracket must close on the same line; multi-line arrays are
    /// left for the parser to judge.
    fn fix_commands_line(&self, line: &str) -> String {
        if !line.contains("\"commands\":") {
            return line.to_string();
        }
        let Some(caps) = self.commands_array.captures(line) else {
            return line.to_string();
        };
        let full = caps.get(0).expect("whole match");
        let interior = caps.get(1).expect("bracket interior").as_str().trim();

        let elements = tokenize_elements(interior);
        let rebuilt = if elements.is_empty() {
            "\"commands\": []".to_string()
        } else {
            format!("\"commands\": [{}]", elements.join(", "))
        };

        let mut fixed = String::with_capacity(line.len() + rebuilt.len());
        fixed.push_str(&line[..full.start()]);
        fixed.push_str(&rebuilt);
        fixed.push_str(&line[full.end()..]);
        fixed
    }
}

impl Default for RepairEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a bracket interior on commas that sit outside quoted tokens,
/// normalizing every element into a quoted JSON string.
///
/// The scanner tracks whether it is inside a single- or double-quoted
/// token; inside quotes a backslash consumes the following character,
/// so an escaped quote never terminates the token. Empty elements are
/// dropped.
fn tokenize_elements(interior: &str) -> Vec<String> {
    let mut elements = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = '\0';

    let mut chars = interior.chars();
    while let Some(c) = chars.next() {
        if in_quotes && c == '\\' {
            current.push(c);
            if let Some(escaped) = chars.next() {
                current.push(escaped);
            }
        } else if (c == '"' || c == '\'') && (!in_quotes || c == quote_char) {
            in_quotes = !in_quotes;
            quote_char = if in_quotes { c } else { '\0' };
            current.push(c);
        } else if c == ',' && !in_quotes {
            if let Some(element) = finish_element(&current) {
                elements.push(element);
            }
            current.clear();
        } else {
            current.push(c);
        }
    }
    if let Some(element) = finish_element(&current) {
        elements.push(element);
    }
    elements
}

/// Normalize one raw element into its quoted form, or `None` if the
/// element is blank.
fn finish_element(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cmd = trimmed.trim_end_matches(',');

    if cmd.len() > 2 && cmd.starts_with('"') && cmd.ends_with('"') {
        // Already quoted: re-escape the interior only.
        let inner = &cmd[1..cmd.len() - 1];
        Some(format!("\"{}\"", escape_interior(inner)))
    } else if cmd.starts_with('"') && cmd.ends_with('"') {
        // `""` or a lone quote character, left as-is.
        Some(cmd.to_string())
    } else {
        Some(format!("\"{}\"", escape_interior(cmd)))
    }
}

/// Escape backslashes and double quotes without double-escaping
/// sequences that are already escaped: an existing `\\` or `\"` pair
/// is copied verbatim, a lone backslash becomes `\\`, and a bare `"`
/// becomes `\"`. Applying this twice yields the same string.
fn escape_interior(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some('\\') | Some('"') => {
                    out.push('\\');
                    out.push(chars.next().expect("peeked escape char"));
                }
                _ => out.push_str("\\\\"),
            },
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}
