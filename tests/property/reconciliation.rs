// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reconciliation partitions expected and found keys

use cim_landscape::coordinator::reconcile;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn keys() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-e]{1,2}", 0..12)
}

proptest! {
    #[test]
    fn prop_matched_and_missing_partition_expected(expected in keys(), found in keys()) {
        let result = reconcile(&expected, &found);

        let expected_set: BTreeSet<&String> = expected.iter().collect();
        let found_set: BTreeSet<&String> = found.iter().collect();

        let matched: BTreeSet<&String> = result.matched.iter().collect();
        let missing: BTreeSet<&String> = result.missing.iter().collect();
        let unknown: BTreeSet<&String> = result.unknown.iter().collect();

        let covered: BTreeSet<&String> = matched.union(&missing).copied().collect();
        let both: BTreeSet<&String> = expected_set.intersection(&found_set).copied().collect();
        let stray: BTreeSet<&String> = found_set.difference(&expected_set).copied().collect();

        prop_assert!(matched.is_disjoint(&missing));
        prop_assert_eq!(covered, expected_set);
        prop_assert_eq!(matched, both);
        prop_assert_eq!(unknown, stray);
    }

    #[test]
    fn prop_no_key_is_reported_twice(expected in keys(), found in keys()) {
        let result = reconcile(&expected, &found);

        for list in [&result.matched, &result.missing, &result.unknown] {
            let unique: BTreeSet<&String> = list.iter().collect();
            prop_assert_eq!(unique.len(), list.len());
        }
    }

    #[test]
    fn prop_everything_found_means_nothing_missing(expected in keys()) {
        let result = reconcile(&expected, &expected);

        prop_assert!(result.missing.is_empty());
        prop_assert!(result.unknown.is_empty());
    }
}
