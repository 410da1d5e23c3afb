// Copyright (c) 2025 - Cowboy AI, Inc.
//! Expected versus found reconciliation

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of comparing declared devices with discovered ones
///
/// # Invariants
/// - `matched = expected ∩ found`
/// - `missing = expected − found`
/// - `unknown = found − expected`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub unknown: Vec<String>,
}

/// Reconcile two key lists
///
/// `matched` and `missing` follow the order of `expected`, `unknown` follows
/// the order of `found`. Duplicates are dropped.
pub fn reconcile(expected: &[String], found: &[String]) -> Reconciliation {
    let expected_set: BTreeSet<&str> = expected.iter().map(String::as_str).collect();
    let found_set: BTreeSet<&str> = found.iter().map(String::as_str).collect();

    let mut seen = BTreeSet::new();
    let mut result = Reconciliation::default();

    for key in expected {
        if !seen.insert(key.as_str()) {
            continue;
        }
        if found_set.contains(key.as_str()) {
            result.matched.push(key.clone());
        } else {
            result.missing.push(key.clone());
        }
    }

    for key in found {
        if !expected_set.contains(key.as_str()) && seen.insert(key.as_str()) {
            result.unknown.push(key.clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reconcile_partitions() {
        let result = reconcile(&keys(&["a", "b", "c"]), &keys(&["c", "d", "a"]));

        assert_eq!(
            result,
            Reconciliation {
                matched: keys(&["a", "c"]),
                missing: keys(&["b"]),
                unknown: keys(&["d"]),
            }
        );
    }

    #[test]
    fn test_duplicates_dropped() {
        let result = reconcile(&keys(&["a", "a"]), &keys(&["x", "x", "a"]));
        assert_eq!(result.matched, keys(&["a"]));
        assert_eq!(result.unknown, keys(&["x"]));
    }

    #[test]
    fn test_nothing_found() {
        let result = reconcile(&keys(&["a"]), &[]);
        assert_eq!(result.missing, keys(&["a"]));
        assert!(result.matched.is_empty());
    }
}
