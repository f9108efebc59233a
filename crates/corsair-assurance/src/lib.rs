// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The Assurance Calculator: deterministic, rule-traced derivation of the
//! [`AssuranceClaim`], [`Dimensions`], freshness, DORA metrics, and risk
//! quantification from an [`IngestedDocument`].

/// Canonical boilerplate-phrase detection.
pub mod boilerplate;
/// Methodology-keyword vocabulary and scoring.
pub mod vocabulary;

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use corsair_core::{
    AssuranceClaim, AssuranceLevel, CALCULATION_VERSION, ControlClassification, Dimensions,
    DoraBand, DoraMetrics, FairMapping, IngestedDocument, Method, PertEstimate, Provenance,
    ProvenanceSource, RiskQuantification, Severity, Status,
};

/// Inputs the calculator needs beyond the [`IngestedDocument`] itself.
#[derive(Debug, Clone)]
pub struct CalculatorInput<'a> {
    /// The ingested document to score.
    pub document: &'a IngestedDocument,
    /// Evidence provenance.
    pub provenance: Provenance,
    /// Whether the observation period met the 90-day sufficiency bar
    /// (drives whether `auditor` evidence can reach L4).
    pub observation_sufficient: bool,
    /// Reference date for freshness calculations. Callers pass the
    /// current date; tests pin a fixed date for determinism.
    pub today: NaiveDate,
    /// Control ids explicitly excluded from scope.
    pub excluded_control_ids: BTreeSet<String>,
}

/// Output of a single calculator run.
#[derive(Debug, Clone)]
pub struct CalculatorOutput {
    /// The derived assurance claim.
    pub claim: AssuranceClaim,
    /// Seven quality dimensions.
    pub dimensions: Dimensions,
    /// DORA-style metrics.
    pub dora_metrics: DoraMetrics,
    /// Beta-PERT/FAIR risk quantification.
    pub risk_quantification: RiskQuantification,
    /// Per-control classification flags (currently only
    /// `generic-boilerplate`).
    pub control_classifications: Vec<ControlClassification>,
    /// Days since `provenance.source_date`, if known.
    pub days_since_source: Option<i64>,
    /// Freshness bucket label (`fresh`, `current`, `stale`, `expired`).
    pub freshness_bucket: Option<&'static str>,
}

/// Source ceiling: the highest [`AssuranceLevel`] a given provenance
/// source may declare, independent of methodology-keyword evidence.
#[must_use]
pub fn source_ceiling(source: ProvenanceSource, observation_sufficient: bool) -> AssuranceLevel {
    match source {
        ProvenanceSource::SelfSource => AssuranceLevel::L1,
        ProvenanceSource::Tool => AssuranceLevel::L2,
        ProvenanceSource::Auditor => {
            if observation_sufficient {
                AssuranceLevel::L4
            } else {
                AssuranceLevel::L3
            }
        }
    }
}

/// Freshness bucket for a given age in days: `fresh` (<30d), `current`
/// (<90d), `stale` (<180d), `expired` (>=180d), boundaries inclusive on
/// the lower side.
#[must_use]
pub fn freshness_bucket(days: i64) -> &'static str {
    if days < 30 {
        "fresh"
    } else if days < 90 {
        "current"
    } else if days < 180 {
        "stale"
    } else {
        "expired"
    }
}

/// Freshness decay: a monotone non-increasing function of age in days,
/// expressed as a 0-100 score.
#[must_use]
pub fn freshness_decay(days: i64) -> f64 {
    match freshness_bucket(days) {
        "fresh" => 100.0,
        "current" => 80.0,
        "stale" => 50.0,
        _ => 20.0,
    }
}

fn method_for_source(source: ProvenanceSource) -> Method {
    match source {
        ProvenanceSource::SelfSource => Method::SelfAssessed,
        ProvenanceSource::Tool => Method::ToolAttested,
        ProvenanceSource::Auditor => Method::AuditorAttested,
    }
}

/// Run the full assurance calculation over `input`.
#[must_use]
pub fn calculate(input: &CalculatorInput<'_>) -> CalculatorOutput {
    let mut rule_trace = Vec::new();
    let ceiling = source_ceiling(input.provenance.source, input.observation_sufficient);
    rule_trace.push(format!(
        "source={:?} ceiling={ceiling} (observation_sufficient={})",
        input.provenance.source, input.observation_sufficient
    ));

    let in_scope: Vec<_> = input
        .document
        .controls
        .iter()
        .filter(|c| !input.excluded_control_ids.contains(&c.id))
        .collect();

    let mut breakdown: BTreeMap<AssuranceLevel, u32> = BTreeMap::new();
    let mut control_classifications = Vec::new();
    let mut per_control_levels = Vec::new();
    let mut boilerplate_count = 0u32;
    let mut evidence_present_count = 0u32;

    for control in &in_scope {
        let text = format!(
            "{} {}",
            control.description,
            control.evidence.as_deref().unwrap_or("")
        );
        let keyword_level = vocabulary::keyword_score(&text);
        let level = keyword_level.min(ceiling);
        per_control_levels.push(level);
        *breakdown.entry(level).or_insert(0) += 1;
        rule_trace.push(format!(
            "control={} keyword_level={keyword_level} -> level={level} (min with ceiling {ceiling})",
            control.id
        ));

        if boilerplate::is_boilerplate(&control.description) {
            boilerplate_count += 1;
            control_classifications.push(ControlClassification {
                control_id: control.id.clone(),
                flags: vec!["generic-boilerplate".to_string()],
            });
            rule_trace.push(format!("control={} flagged generic-boilerplate", control.id));
        }
        if control.evidence.is_some() {
            evidence_present_count += 1;
        }
    }

    let declared = per_control_levels
        .iter()
        .min()
        .copied()
        .unwrap_or(AssuranceLevel::L0);
    rule_trace.push(format!("declared={declared}"));

    let tested = in_scope.len() as u32;
    let failed = in_scope
        .iter()
        .filter(|c| c.status == Status::Ineffective)
        .count() as u32;
    let all_pass = tested > 0 && failed == 0;
    if all_pass {
        rule_trace.push(
            "all in-scope controls passed: applying all-pass bias flag (consistency dimension reduced, declared level unaffected)"
                .to_string(),
        );
    }

    // `declared` is already the minimum per-control level, so every
    // in-scope control trivially meets it; `verified` only needs to rule
    // out the zero-controls case.
    let verified = tested > 0;

    let claim = AssuranceClaim {
        declared,
        method: method_for_source(input.provenance.source),
        verified,
        breakdown,
        rule_trace,
        calculation_version: CALCULATION_VERSION.to_string(),
    };

    let days_since_source = input
        .provenance
        .source_date
        .map(|d| (input.today - d).num_days());
    let bucket = days_since_source.map(freshness_bucket);
    let freshness_score = days_since_source.map_or(0.0, freshness_decay);

    let coverage = if input.document.controls.is_empty() {
        0.0
    } else {
        100.0 * f64::from(tested) / input.document.controls.len() as f64
    };
    let capability = if tested == 0 {
        0.0
    } else {
        100.0 * f64::from(declared.value()) / 4.0
    };
    let specificity = if tested == 0 {
        0.0
    } else {
        100.0 * (1.0 - f64::from(boilerplate_count) / f64::from(tested))
    };
    let independence = match input.provenance.source {
        ProvenanceSource::SelfSource => 20.0,
        ProvenanceSource::Tool => 60.0,
        ProvenanceSource::Auditor => 90.0,
    };
    let reproducibility = if tested == 0 {
        0.0
    } else {
        100.0 * f64::from(evidence_present_count) / f64::from(tested)
    };
    let consistency = if all_pass { 60.0 } else { 90.0 };
    let methodology = specificity;

    let dimensions = Dimensions {
        capability,
        coverage,
        reliability: specificity,
        methodology,
        freshness: freshness_score,
        independence,
        consistency,
    };

    let mut pairing_flags = Vec::new();
    if freshness_score >= 80.0 && reproducibility < 40.0 {
        pairing_flags.push(
            "high freshness + low reproducibility: evidence refreshed but cannot be re-verified"
                .to_string(),
        );
    }
    let composite = (freshness_score + specificity + independence + reproducibility) / 4.0;
    let band = if composite < 40.0 {
        DoraBand::Low
    } else if composite < 75.0 {
        DoraBand::Medium
    } else {
        DoraBand::High
    };
    let dora_metrics = DoraMetrics {
        freshness: freshness_score,
        specificity,
        independence,
        reproducibility,
        band,
        pairing_flags,
    };

    let risk_quantification = quantify_risk(&in_scope);

    CalculatorOutput {
        claim,
        dimensions,
        dora_metrics,
        risk_quantification,
        control_classifications,
        days_since_source,
        freshness_bucket: bucket,
    }
}

fn quantify_risk(in_scope: &[&corsair_core::IngestedControl]) -> RiskQuantification {
    let weight = |s: Severity| -> f64 {
        match s {
            Severity::Critical => 1.0,
            Severity::High => 0.6,
            Severity::Medium => 0.3,
            Severity::Low => 0.1,
        }
    };
    let failed_weight: f64 = in_scope
        .iter()
        .filter(|c| c.status == Status::Ineffective)
        .map(|c| weight(c.severity))
        .sum();
    let total = in_scope.len().max(1) as f64;
    let freq_most_likely = (failed_weight / total).clamp(0.0, 1.0);
    let beta_pert = PertEstimate {
        min: (freq_most_likely * 0.5).clamp(0.0, 1.0),
        most_likely: freq_most_likely,
        max: (freq_most_likely * 1.5).clamp(0.0, 1.0),
    };
    let fair = FairMapping {
        loss_event_frequency: beta_pert,
        loss_magnitude_usd: PertEstimate {
            min: 50_000.0,
            most_likely: 250_000.0,
            max: 1_000_000.0,
        },
    };
    RiskQuantification { beta_pert, fair }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `freshness_decay` is a monotone non-increasing function of age:
        /// evidence never gets fresher as it ages.
        #[test]
        fn freshness_decay_is_monotone_non_increasing(a in 0i64..2000, b in 0i64..2000) {
            let (younger, older) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(freshness_decay(younger) >= freshness_decay(older));
        }

        /// The source ceiling never exceeds L4 and auditor evidence with an
        /// insufficient observation period never reaches it.
        #[test]
        fn source_ceiling_respects_observation_sufficiency(sufficient in any::<bool>()) {
            let ceiling = source_ceiling(ProvenanceSource::Auditor, sufficient);
            if sufficient {
                prop_assert_eq!(ceiling, AssuranceLevel::L4);
            } else {
                prop_assert_eq!(ceiling, AssuranceLevel::L3);
            }
        }
    }
}
