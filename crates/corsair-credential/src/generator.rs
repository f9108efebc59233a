// SPDX-License-Identifier: MIT OR Apache-2.0
//! Composes a [`CredentialSubject`] from the Ingestion Mapper's and
//! Assurance Calculator's outputs. This is the part of the CPOE Generator
//! that happens before signing: everything here is a pure function of its
//! inputs, matching the pipeline's `fn(prev) -> next` shape.

use corsair_assurance::CalculatorOutput;
use corsair_core::{CredentialSubject, FrameworkCoverage, ObservationPeriod, Provenance};
use corsair_ingest::MarqueGeneratorInput;
use std::collections::BTreeMap;

/// Everything [`generate_subject`] needs beyond the Ingestion Mapper and
/// Assurance Calculator outputs themselves.
#[derive(Debug, Clone)]
pub struct GeneratorInput<'a> {
    /// Ingestion Mapper output (summary, drift findings, direct framework table).
    pub marque_input: &'a MarqueGeneratorInput,
    /// Assurance Calculator output (claim, dimensions, DORA, risk).
    pub calculator_output: &'a CalculatorOutput,
    /// Evidence provenance, as supplied to the calculator.
    pub provenance: Provenance,
    /// The calendar window the assessment covered.
    pub observation_period: ObservationPeriod,
    /// Human-readable label for how deep the assessment went (e.g.
    /// `"tool-scan"`, `"manual-audit"`).
    pub assessment_depth: String,
    /// Resolver-derived cross-framework coverage, merged on top of the
    /// direct framework references already tallied in `marque_input`.
    /// Pass an empty map when no resolver pass was run.
    pub resolved_frameworks: BTreeMap<String, FrameworkCoverage>,
}

/// Distinct evidence type names, derived from `provenance`'s evidence-type
/// distribution (if present). Order matches the distribution's own key
/// order (a `BTreeMap`, so lexical).
#[must_use]
fn evidence_types(provenance: &Provenance) -> Vec<String> {
    provenance
        .evidence_type_distribution
        .as_ref()
        .map(|d| d.keys().cloned().collect())
        .unwrap_or_default()
}

/// A 0-100 composite score for how trustworthy the provenance is: the mean
/// of the independence and specificity (reliability) dimensions already
/// computed by the Assurance Calculator.
#[must_use]
fn provenance_quality(output: &CalculatorOutput) -> f64 {
    (output.dimensions.independence + output.dimensions.reliability) / 2.0
}

/// Merge `resolved` into `direct`, combining per-framework tallies and
/// de-duplicating control id lists. `direct` wins ties in ordering (its
/// entries come first in the merged `controls`/`failed_controls` lists).
fn merge_framework_tables(
    mut direct: BTreeMap<String, FrameworkCoverage>,
    resolved: BTreeMap<String, FrameworkCoverage>,
) -> BTreeMap<String, FrameworkCoverage> {
    for (framework, coverage) in resolved {
        let entry = direct.entry(framework).or_default();
        entry.controls_mapped += coverage.controls_mapped;
        entry.passed += coverage.passed;
        entry.failed += coverage.failed;
        for id in coverage.controls {
            if !entry.controls.contains(&id) {
                entry.controls.push(id);
            }
        }
        for id in coverage.failed_controls {
            if !entry.failed_controls.contains(&id) {
                entry.failed_controls.push(id);
            }
        }
    }
    direct
}

/// Assemble the final [`CredentialSubject`] for signing.
#[must_use]
pub fn generate_subject(input: GeneratorInput<'_>) -> CredentialSubject {
    let frameworks = merge_framework_tables(
        input.marque_input.framework_table.clone(),
        input.resolved_frameworks,
    );

    CredentialSubject {
        subject_type: "ControlAssessment".to_string(),
        scope: input.marque_input.document.metadata.scope.clone(),
        assurance: input.calculator_output.claim.clone(),
        provenance: input.provenance.clone(),
        summary: input.marque_input.summary.clone(),
        dimensions: input.calculator_output.dimensions.clone(),
        evidence_types: evidence_types(&input.provenance),
        observation_period: input.observation_period,
        control_classifications: input.calculator_output.control_classifications.clone(),
        assessment_depth: input.assessment_depth,
        provenance_quality: provenance_quality(input.calculator_output),
        dora_metrics: input.calculator_output.dora_metrics.clone(),
        risk_quantification: input.calculator_output.risk_quantification.clone(),
        frameworks,
    }
}
