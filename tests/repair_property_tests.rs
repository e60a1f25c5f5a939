//! Property-based tests for the repair engine and normalizer.
//!
//! Repair runs against attacker-controlled text, so the properties
//! here are deliberately adversarial: total over arbitrary input,
//! idempotent, and semantics-preserving for well-formed documents.

use nectar::normalize::split_commands;
use nectar::repair::RepairEngine;
use proptest::prelude::*;
use serde_json::{json, Value};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // Repair must accept any text without panicking and reach a
    // fixpoint after a single application.
    #[test]
    fn prop_repair_is_idempotent(input in any::<String>()) {
        let engine = RepairEngine::new();
        let once = engine.repair(&input);
        let twice = engine.repair(&once);
        prop_assert_eq!(&once, &twice);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    // A well-formed commands array of printable strings survives
    // repair with its content intact. Control characters are excluded
    // because their JSON escapes (\n, \t, \uXXXX) are exactly the
    // backslash sequences the heuristic is documented to mangle, and
    // closing brackets are excluded because the trailing-comma fix
    // cannot tell string content from structure.
    #[test]
    fn prop_clean_commands_preserved(
        commands in prop::collection::vec("[ -\\\\^-|~]{0,24}", 0..6),
    ) {
        let doc = serde_json::to_string(&json!({ "commands": commands })).unwrap();
        let engine = RepairEngine::new();
        let repaired = engine.repair(&doc);

        let parsed: Value = serde_json::from_str(&repaired).unwrap();
        let out: Vec<String> = parsed["commands"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();

        // Quoted elements round-trip exactly, embedded quotes,
        // backslashes and whitespace included.
        prop_assert_eq!(out, commands);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    // Unquoted bare tokens become valid quoted JSON strings.
    #[test]
    fn prop_bare_tokens_become_valid_json(
        tokens in prop::collection::vec("[a-zA-Z0-9_./ -]{1,16}", 1..6),
    ) {
        let line = format!("{{\"commands\": [{}]}}", tokens.join(", "));
        let engine = RepairEngine::new();
        let repaired = engine.repair(&line);

        let parsed: Value = serde_json::from_str(&repaired).unwrap();
        let out: Vec<String> = parsed["commands"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();

        let expected: Vec<String> = tokens
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        prop_assert_eq!(out, expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    // The command-count invariant: after splitting, no element
    // contains a semicolon-separated compound and order is preserved.
    #[test]
    fn prop_split_commands_flattens_completely(
        commands in prop::collection::vec("[a-z ;]{0,20}", 0..8),
    ) {
        let values: Vec<Value> = commands.iter().map(|c| json!(c)).collect();
        let split = split_commands(values);

        // No compound command survives the split.
        for value in &split {
            prop_assert!(!value.as_str().unwrap().contains(';'));
        }

        // Flattening preserves relative order; commands without a
        // semicolon pass through verbatim, split parts are trimmed.
        let expected: Vec<String> = commands
            .iter()
            .flat_map(|c| {
                if c.contains(';') {
                    c.split(';')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                } else {
                    vec![c.clone()]
                }
            })
            .collect();
        let actual: Vec<String> = split
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        prop_assert_eq!(actual, expected);
    }
}
