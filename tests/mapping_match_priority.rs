// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mapping Registry: priority-ordered rule selection across the crate
//! boundary, using the registry's public `add`/`select`/`ingest` API.

use corsair_mapping::{ControlsSpec, MappingRegistry, MappingRule, MatchPredicate};
use serde_json::json;

fn mapping(id: &str, priority: i64, all_of: &[&str]) -> MappingRule {
    MappingRule {
        id: id.to_string(),
        name: None,
        source: Some("tool".to_string()),
        priority,
        match_predicate: MatchPredicate {
            all_of: all_of.iter().map(|s| s.to_string()).collect(),
            any_of: vec![],
        },
        metadata: Default::default(),
        controls: Some(ControlsSpec {
            path: "findings".to_string(),
            id_path: Some("id".to_string()),
            description_path: None,
            status_path: None,
            status_map: None,
            severity_path: None,
            severity_map: None,
            evidence_path: None,
            framework_refs: None,
        }),
        passthrough: None,
    }
}

#[test]
fn the_higher_priority_mapping_wins_when_both_match() {
    let mut registry = MappingRegistry::new();
    registry.add(mapping("low", 10, &["findings"])).unwrap();
    registry.add(mapping("high", 20, &["findings"])).unwrap();

    let selected = registry.select(&json!({"findings": []}));
    assert_eq!(selected.id, "high");
}

#[test]
fn priority_order_is_independent_of_load_order() {
    let mut registry = MappingRegistry::new();
    registry.add(mapping("high", 20, &["findings"])).unwrap();
    registry.add(mapping("low", 10, &["findings"])).unwrap();

    let selected = registry.select(&json!({"findings": []}));
    assert_eq!(selected.id, "high", "load order must not override priority order");
}

#[test]
fn ingest_returns_the_winning_rule_alongside_its_extract_outcome() {
    let mut registry = MappingRegistry::new();
    registry.add(mapping("low", 10, &["findings"])).unwrap();
    registry.add(mapping("high", 20, &["findings"])).unwrap();

    let (rule, _outcome) = registry
        .ingest(&json!({"findings": [{"id": "f1"}]}))
        .unwrap();
    assert_eq!(rule.id, "high");
}

#[test]
fn an_input_matching_nothing_falls_back_to_generic() {
    let registry = MappingRegistry::new();
    let selected = registry.select(&json!({"unrelated": true}));
    assert_eq!(selected.id, "generic");
}
