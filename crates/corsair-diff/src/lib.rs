// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The Diff Engine: compares two CPOEs over similar scope and reports the
//! score delta and per-control failure changes.
//!
//! Matching operates on `(framework, controlId)` pairs drawn from each
//! subject's `frameworks` coverage table — the only place a credential
//! subject names individual controls. The wider match rule (controls also
//! matching on a byte-identical `id` outside any framework) has no
//! reachable case in this data model: a [`corsair_core::CredentialSubject`]
//! never carries a bare, framework-less control id.

use std::collections::BTreeSet;

use corsair_core::CredentialSubject;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single `(framework, controlId)` reference, the unit the Diff Engine
/// matches controls on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct ControlRef {
    /// Framework name (e.g. `"SOC2"`).
    pub framework: String,
    /// The framework's own control identifier (e.g. `"CC6.1"`).
    pub control_id: String,
}

/// The result of comparing a current CPOE against a previous one.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CpoeDiff {
    /// `currentScore - previousScore`.
    pub score_delta: i64,
    /// The current CPOE's `summary.overallScore`.
    pub current_score: u32,
    /// The previous CPOE's `summary.overallScore`.
    pub previous_score: u32,
    /// `true` iff `current_score < previous_score`.
    pub has_regression: bool,
    /// Controls failed now that were not failed (or not present) before.
    pub new_failures: Vec<ControlRef>,
    /// Controls failed before that are no longer failed (or no longer
    /// present) now.
    pub resolved_failures: Vec<ControlRef>,
    /// `Some((previous, current))` scope strings, when they differ.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_scope: Option<(String, String)>,
}

fn failed_control_refs(subject: &CredentialSubject) -> BTreeSet<ControlRef> {
    subject
        .frameworks
        .iter()
        .flat_map(|(framework, coverage)| {
            coverage.failed_controls.iter().map(move |control_id| ControlRef {
                framework: framework.clone(),
                control_id: control_id.clone(),
            })
        })
        .collect()
}

/// Compare `current` against `previous`.
#[must_use]
pub fn diff(current: &CredentialSubject, previous: &CredentialSubject) -> CpoeDiff {
    let current_score = current.summary.overall_score;
    let previous_score = previous.summary.overall_score;

    let current_failed = failed_control_refs(current);
    let previous_failed = failed_control_refs(previous);

    let new_failures = current_failed.difference(&previous_failed).cloned().collect();
    let resolved_failures = previous_failed.difference(&current_failed).cloned().collect();

    let changed_scope = (current.scope != previous.scope).then(|| (previous.scope.clone(), current.scope.clone()));

    CpoeDiff {
        score_delta: i64::from(current_score) - i64::from(previous_score),
        current_score,
        previous_score,
        has_regression: current_score < previous_score,
        new_failures,
        resolved_failures,
        changed_scope,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use corsair_core::{
        AssuranceClaim, AssuranceLevel, Dimensions, DoraBand, DoraMetrics, FairMapping,
        FrameworkCoverage, Method, ObservationPeriod, PertEstimate, Provenance, ProvenanceSource,
        RiskQuantification, Summary,
    };
    use std::collections::BTreeMap;

    fn subject(scope: &str, overall_score: u32, frameworks: BTreeMap<String, FrameworkCoverage>) -> CredentialSubject {
        CredentialSubject {
            subject_type: "ControlAssessment".to_string(),
            scope: scope.to_string(),
            assurance: AssuranceClaim {
                declared: AssuranceLevel::L2,
                method: Method::ToolAttested,
                verified: true,
                breakdown: BTreeMap::new(),
                rule_trace: vec![],
                calculation_version: corsair_core::CALCULATION_VERSION.to_string(),
            },
            provenance: Provenance {
                source: ProvenanceSource::Tool,
                source_identity: None,
                source_date: NaiveDate::from_ymd_opt(2026, 6, 1),
                evidence_type_distribution: None,
            },
            summary: Summary {
                controls_tested: 10,
                controls_passed: overall_score / 10,
                controls_failed: 10 - overall_score / 10,
                overall_score,
            },
            dimensions: Dimensions {
                capability: 80.0,
                coverage: 100.0,
                reliability: 80.0,
                methodology: 80.0,
                freshness: 100.0,
                independence: 60.0,
                consistency: 90.0,
            },
            evidence_types: vec![],
            observation_period: ObservationPeriod::from_dates(
                NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            ),
            control_classifications: vec![],
            assessment_depth: "tool-scan".to_string(),
            provenance_quality: 60.0,
            dora_metrics: DoraMetrics {
                freshness: 100.0,
                specificity: 80.0,
                independence: 60.0,
                reproducibility: 90.0,
                band: DoraBand::High,
                pairing_flags: vec![],
            },
            risk_quantification: RiskQuantification {
                beta_pert: PertEstimate { min: 0.0, most_likely: 0.0, max: 0.0 },
                fair: FairMapping {
                    loss_event_frequency: PertEstimate { min: 0.0, most_likely: 0.0, max: 0.0 },
                    loss_magnitude_usd: PertEstimate { min: 50_000.0, most_likely: 250_000.0, max: 1_000_000.0 },
                },
            },
            frameworks,
        }
    }

    fn coverage(controls: &[&str], failed: &[&str]) -> FrameworkCoverage {
        FrameworkCoverage {
            controls_mapped: controls.len() as u32,
            passed: (controls.len() - failed.len()) as u32,
            failed: failed.len() as u32,
            controls: controls.iter().map(|s| s.to_string()).collect(),
            failed_controls: failed.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn detects_regression_and_new_failure() {
        let previous = subject(
            "prod AWS account",
            90,
            BTreeMap::from([("SOC2".to_string(), coverage(&["CC6.1", "CC6.2"], &[]))]),
        );
        let current = subject(
            "prod AWS account",
            80,
            BTreeMap::from([("SOC2".to_string(), coverage(&["CC6.1", "CC6.2"], &["CC6.2"]))]),
        );
        let d = diff(&current, &previous);
        assert_eq!(d.score_delta, -10);
        assert!(d.has_regression);
        assert_eq!(
            d.new_failures,
            vec![ControlRef { framework: "SOC2".to_string(), control_id: "CC6.2".to_string() }]
        );
        assert!(d.resolved_failures.is_empty());
        assert!(d.changed_scope.is_none());
    }

    #[test]
    fn detects_resolved_failure_and_improved_score() {
        let previous = subject(
            "prod AWS account",
            80,
            BTreeMap::from([("SOC2".to_string(), coverage(&["CC6.1"], &["CC6.1"]))]),
        );
        let current = subject(
            "prod AWS account",
            100,
            BTreeMap::from([("SOC2".to_string(), coverage(&["CC6.1"], &[]))]),
        );
        let d = diff(&current, &previous);
        assert_eq!(d.score_delta, 20);
        assert!(!d.has_regression);
        assert!(d.new_failures.is_empty());
        assert_eq!(
            d.resolved_failures,
            vec![ControlRef { framework: "SOC2".to_string(), control_id: "CC6.1".to_string() }]
        );
    }

    #[test]
    fn reports_changed_scope() {
        let previous = subject("prod AWS account", 90, BTreeMap::new());
        let current = subject("prod AWS + staging accounts", 90, BTreeMap::new());
        let d = diff(&current, &previous);
        assert_eq!(
            d.changed_scope,
            Some(("prod AWS account".to_string(), "prod AWS + staging accounts".to_string()))
        );
    }

    #[test]
    fn equal_scores_are_not_a_regression() {
        let previous = subject("scope", 90, BTreeMap::new());
        let current = subject("scope", 90, BTreeMap::new());
        assert!(!diff(&current, &previous).has_regression);
    }
}
