// SPDX-License-Identifier: MIT OR Apache-2.0
//! The mapping match algorithm.

use serde_json::Value;

use crate::path::is_present;
use crate::rule::MappingRule;

/// Whether `rule` matches `input`: every `allOf` path is present, and (if
/// `anyOf` is non-empty) at least one `anyOf` path is present.
#[must_use]
pub fn matches(rule: &MappingRule, input: &Value) -> bool {
    let all_present = rule
        .match_predicate
        .all_of
        .iter()
        .all(|p| is_present(input, p));
    if !all_present {
        return false;
    }
    if rule.match_predicate.any_of.is_empty() {
        return true;
    }
    rule.match_predicate
        .any_of
        .iter()
        .any(|p| is_present(input, p))
}

/// Select the single best-matching rule for `input` from `rules`, already
/// expected to be pre-sorted by descending priority then deterministic
/// file-name order. Returns the first rule (in iteration order) that
/// matches.
#[must_use]
pub fn select_best<'a>(rules: &'a [MappingRule], input: &Value) -> Option<&'a MappingRule> {
    rules.iter().find(|r| matches(r, input))
}
