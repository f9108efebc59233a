// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical boilerplate-phrase detection for control descriptions.

/// A small corpus of canonical boilerplate phrasing seen across generic
/// compliance-tool output. Matching is case-insensitive substring.
const BOILERPLATE_CORPUS: &[&str] = &[
    "controls are designed and operating effectively",
    "no exceptions noted",
    "management has implemented appropriate controls",
    "control operating effectively as designed",
    "no deviations were identified",
];

/// Whether `description` matches a canonical boilerplate phrase.
#[must_use]
pub fn is_boilerplate(description: &str) -> bool {
    let lower = description.to_lowercase();
    BOILERPLATE_CORPUS.iter().any(|phrase| lower.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_phrase_is_flagged() {
        assert!(is_boilerplate(
            "No exceptions noted during the review period."
        ));
    }

    #[test]
    fn specific_description_is_not_flagged() {
        assert!(!is_boilerplate(
            "MFA enforced via Okta for all 214 admin accounts as of 2026-01-15."
        ));
    }
}
