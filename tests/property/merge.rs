// Copyright (c) 2025 - Cowboy AI, Inc.
//! Later documents override earlier ones key by key

use cim_landscape::config::merge_documents;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn flat_object() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-f]", any::<i64>(), 0..6)
        .prop_map(|m| m.into_iter().map(|(k, v)| (k, json!(v))).collect())
}

proptest! {
    #[test]
    fn prop_overlay_wins_and_base_survives(base in flat_object(), overlay in flat_object()) {
        let mut merged = json!({ "pod": Value::Object(base.clone()) });
        merge_documents(&mut merged, json!({ "pod": Value::Object(overlay.clone()) }));
        let pod = merged["pod"].as_object().unwrap();

        for (key, value) in &overlay {
            prop_assert_eq!(&pod[key], value);
        }
        for (key, value) in &base {
            if !overlay.contains_key(key) {
                prop_assert_eq!(&pod[key], value);
            }
        }
        prop_assert!(pod.keys().all(|k| base.contains_key(k) || overlay.contains_key(k)));
    }

    #[test]
    fn prop_arrays_are_replaced(base in prop::collection::vec(any::<u8>(), 0..5),
                                overlay in prop::collection::vec(any::<u8>(), 0..5)) {
        let mut merged = json!({ "devices": base });
        merge_documents(&mut merged, json!({ "devices": overlay.clone() }));

        prop_assert_eq!(&merged["devices"], &json!(overlay));
    }
}
