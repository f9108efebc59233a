// SPDX-License-Identifier: MIT OR Apache-2.0
//! Methodology-keyword vocabulary used to score individual controls.

use corsair_core::AssuranceLevel;

/// Keyword phrases, highest level first. The first phrase found in the
/// scanned text wins.
const VOCABULARY: &[(&str, AssuranceLevel)] = &[
    ("attested by auditor", AssuranceLevel::L4),
    ("observed over period", AssuranceLevel::L3),
    ("demonstrated", AssuranceLevel::L2),
    ("tested", AssuranceLevel::L2),
    ("configured", AssuranceLevel::L1),
    ("enabled", AssuranceLevel::L1),
    ("documented", AssuranceLevel::L0),
];

/// Score a control's free text (description plus evidence) against the
/// fixed methodology-keyword vocabulary. Returns [`AssuranceLevel::L0`]
/// when nothing in the vocabulary is found — an undocumented claim still
/// gets the floor level, not a rejection.
#[must_use]
pub fn keyword_score(text: &str) -> AssuranceLevel {
    let lower = text.to_lowercase();
    VOCABULARY
        .iter()
        .find(|(phrase, _)| lower.contains(phrase))
        .map_or(AssuranceLevel::L0, |(_, level)| *level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_ranked_keyword_wins() {
        let text = "Control was documented and later attested by auditor during the review.";
        assert_eq!(keyword_score(text), AssuranceLevel::L4);
    }

    #[test]
    fn no_keyword_floors_to_l0() {
        assert_eq!(keyword_score("Nothing notable here."), AssuranceLevel::L0);
    }

    #[test]
    fn configured_and_enabled_are_both_l1() {
        assert_eq!(keyword_score("MFA is configured for all users."), AssuranceLevel::L1);
        assert_eq!(keyword_score("Encryption is enabled at rest."), AssuranceLevel::L1);
    }
}
