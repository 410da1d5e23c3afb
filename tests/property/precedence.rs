// Copyright (c) 2025 - Cowboy AI, Inc.
//! Couplings sort by precedence, ties in registration order

use proptest::prelude::*;
use serde_json::{Map, Value};
use std::sync::Arc;

use cim_landscape::coordinator::Coordinator;
use cim_landscape::coupling::{
    sort_by_precedence, CoordinatorContext, EnvironmentConstraints, Participation, SshCoupling,
};
use cim_landscape::{IntegrationCoupling, LandscapeResult, Precedence};

/// Coupling that only carries a precedence
struct Ranked {
    class: String,
    precedence: Precedence,
}

impl IntegrationCoupling for Ranked {
    fn section(&self) -> &str {
        "devices"
    }

    fn leaf(&self) -> &str {
        "deviceType"
    }

    fn class(&self) -> &str {
        &self.class
    }

    fn declare_precedence(&self) -> Precedence {
        self.precedence
    }

    fn attach_to_environment(&self, _: &EnvironmentConstraints<'_>) -> LandscapeResult<Participation> {
        Ok(Participation::NotParticipating)
    }

    fn create_coordinator(&self, _: &CoordinatorContext<'_>) -> LandscapeResult<()> {
        Ok(())
    }

    fn coordinator(&self) -> Option<Arc<dyn Coordinator>> {
        None
    }

    fn validate_item_configuration(&self, _: &Map<String, Value>) -> (Vec<String>, Vec<String>) {
        (Vec::new(), Vec::new())
    }
}

fn precedence() -> impl Strategy<Value = Precedence> {
    prop_oneof![
        (0u32..5).prop_map(|n| Precedence::Ordered(n * 10000)),
        Just(Precedence::Unordered),
    ]
}

proptest! {
    #[test]
    fn prop_sort_is_ordered_and_stable(levels in prop::collection::vec(precedence(), 0..16)) {
        let mut couplings: Vec<Arc<dyn IntegrationCoupling>> = levels
            .iter()
            .enumerate()
            .map(|(i, p)| Arc::new(Ranked { class: i.to_string(), precedence: *p }) as Arc<dyn IntegrationCoupling>)
            .collect();

        sort_by_precedence(&mut couplings);

        for pair in couplings.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.declare_precedence() <= b.declare_precedence());
            if a.declare_precedence() == b.declare_precedence() {
                let ia: usize = a.class().parse().unwrap();
                let ib: usize = b.class().parse().unwrap();
                prop_assert!(ia < ib);
            }
        }
    }

    #[test]
    fn prop_unordered_sorts_last(n in 0u32..u32::MAX) {
        prop_assert!(Precedence::Ordered(n) < Precedence::Unordered);
    }
}

#[test]
fn test_ssh_is_primary_protocol() {
    assert_eq!(SshCoupling::new().declare_precedence(), Precedence::Ordered(40000));
}
