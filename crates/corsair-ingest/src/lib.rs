// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The Ingestion Mapper: `IngestedDocument -> MarqueGeneratorInput`.
//!
//! Controls become drift findings (`status = ineffective` means
//! `drift = true`). Framework references fold into a per-framework
//! control table. There are no raid results in this path — that is a
//! distinct evidence kind this pipeline never sees.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use corsair_core::{FrameworkCoverage, IngestedDocument, Severity, Status, Summary};

/// A single control re-framed as a drift signal.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DriftFinding {
    /// The control's identifier.
    pub control_id: String,
    /// The control's description, carried through verbatim.
    pub description: String,
    /// `true` iff the control's status is `ineffective`.
    pub drift: bool,
    /// The control's severity.
    pub severity: Severity,
}

/// The Ingestion Mapper's output: everything the Assurance Calculator and
/// Framework Resolver need, derived purely from the `IngestedDocument`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MarqueGeneratorInput {
    /// The document this input was derived from.
    pub document: IngestedDocument,
    /// Every control, re-framed as a drift finding.
    pub drift_findings: Vec<DriftFinding>,
    /// Pass/fail/score rollup.
    pub summary: Summary,
    /// Count of controls at each severity, present only if at least one
    /// control carries a severity distinct from the rest (i.e. the
    /// document actually varies in severity).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_distribution: Option<BTreeMap<Severity, u32>>,
    /// Preliminary per-framework coverage, keyed by framework name. This
    /// is *not* the resolver's final cross-framework table — only the
    /// frameworks each control directly declares are tallied here. The
    /// Framework Resolver fills in technique/plugin-derived frameworks on
    /// top of this.
    pub framework_table: BTreeMap<String, FrameworkCoverage>,
}

/// Transform an [`IngestedDocument`] into a [`MarqueGeneratorInput`].
#[must_use]
pub fn map_to_marque_input(document: &IngestedDocument) -> MarqueGeneratorInput {
    let drift_findings = document
        .controls
        .iter()
        .map(|c| DriftFinding {
            control_id: c.id.clone(),
            description: c.description.clone(),
            drift: c.status == Status::Ineffective,
            severity: c.severity,
        })
        .collect();

    let summary = compute_summary(document);
    let severity_distribution = compute_severity_distribution(document);
    let framework_table = compute_framework_table(document);

    MarqueGeneratorInput {
        document: document.clone(),
        drift_findings,
        summary,
        severity_distribution,
        framework_table,
    }
}

/// `passed = count(status=effective)`; `failed = count(status=ineffective)`;
/// `tested = len(controls)`; `overallScore = round(100*passed/tested)` if
/// `tested > 0`, else `0`.
#[must_use]
pub fn compute_summary(document: &IngestedDocument) -> Summary {
    let tested = document.controls.len() as u32;
    let passed = document
        .controls
        .iter()
        .filter(|c| c.status == Status::Effective)
        .count() as u32;
    let failed = document
        .controls
        .iter()
        .filter(|c| c.status == Status::Ineffective)
        .count() as u32;
    let overall_score = if tested > 0 {
        ((100.0 * f64::from(passed) / f64::from(tested)).round()) as u32
    } else {
        0
    };
    Summary {
        controls_tested: tested,
        controls_passed: passed,
        controls_failed: failed,
        overall_score,
    }
}

/// Derive a severity histogram, present only when the document's controls
/// carry severity information at all (i.e. `controls` is non-empty).
#[must_use]
pub fn compute_severity_distribution(
    document: &IngestedDocument,
) -> Option<BTreeMap<Severity, u32>> {
    if document.controls.is_empty() {
        return None;
    }
    let mut dist: BTreeMap<Severity, u32> = BTreeMap::new();
    for c in &document.controls {
        *dist.entry(c.severity).or_insert(0) += 1;
    }
    Some(dist)
}

/// Tally each control's directly-declared framework references into a
/// per-framework coverage table.
#[must_use]
pub fn compute_framework_table(
    document: &IngestedDocument,
) -> BTreeMap<String, FrameworkCoverage> {
    let mut table: BTreeMap<String, FrameworkCoverage> = BTreeMap::new();
    for control in &document.controls {
        for reference in &control.framework_refs {
            let entry = table.entry(reference.framework.clone()).or_default();
            entry.controls_mapped += 1;
            entry.controls.push(reference.control_id.clone());
            match control.status {
                Status::Effective => entry.passed += 1,
                Status::Ineffective => {
                    entry.failed += 1;
                    entry.failed_controls.push(reference.control_id.clone());
                }
                Status::NotTested => {}
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use corsair_core::{DocumentMetadata, FrameworkRef, IngestedControl};

    fn control(id: &str, status: Status, refs: Vec<FrameworkRef>) -> IngestedControl {
        IngestedControl {
            id: id.to_string(),
            description: "MFA enforced".into(),
            status,
            severity: Severity::High,
            evidence: None,
            framework_refs: refs,
        }
    }

    fn doc(controls: Vec<IngestedControl>) -> IngestedDocument {
        IngestedDocument {
            source: "generic".into(),
            metadata: DocumentMetadata {
                title: "Q1".into(),
                issuer: "Acme".into(),
                date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                scope: "prod".into(),
                auditor: None,
                report_type: None,
                raw_text_hash: None,
            },
            controls,
            assessment_context: None,
        }
    }

    #[test]
    fn summary_computes_rounded_score() {
        let d = doc(vec![
            control("c1", Status::Effective, vec![]),
            control("c2", Status::Effective, vec![]),
            control("c3", Status::Ineffective, vec![]),
        ]);
        let s = compute_summary(&d);
        assert_eq!(s.controls_tested, 3);
        assert_eq!(s.controls_passed, 2);
        assert_eq!(s.controls_failed, 1);
        assert_eq!(s.overall_score, 67);
    }

    #[test]
    fn zero_controls_scores_zero() {
        let d = doc(vec![]);
        let s = compute_summary(&d);
        assert_eq!(s.overall_score, 0);
    }

    #[test]
    fn ineffective_controls_mark_drift() {
        let d = doc(vec![control("c1", Status::Ineffective, vec![])]);
        let input = map_to_marque_input(&d);
        assert!(input.drift_findings[0].drift);
    }

    #[test]
    fn framework_table_tallies_pass_and_fail() {
        let refs = vec![FrameworkRef {
            framework: "SOC2".into(),
            control_id: "CC6.1".into(),
            control_name: None,
        }];
        let d = doc(vec![
            control("c1", Status::Effective, refs.clone()),
            control("c2", Status::Ineffective, refs),
        ]);
        let table = compute_framework_table(&d);
        let soc2 = &table["SOC2"];
        assert_eq!(soc2.controls_mapped, 2);
        assert_eq!(soc2.passed, 1);
        assert_eq!(soc2.failed, 1);
    }
}
