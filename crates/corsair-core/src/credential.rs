// SPDX-License-Identifier: MIT OR Apache-2.0
//! The signed credential subject and its supporting types.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::assurance::{AssuranceClaim, DoraMetrics, ObservationPeriod, Provenance, RiskQuantification};

/// Seven 0–100 scalar quality dimensions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Dimensions {
    /// How capable the evidenced controls are, independent of coverage.
    pub capability: f64,
    /// Fraction of the declared scope actually covered by controls.
    pub coverage: f64,
    /// How consistently the evidence holds up under scrutiny.
    pub reliability: f64,
    /// Quality of the assessment methodology itself.
    pub methodology: f64,
    /// Recency of the underlying evidence.
    pub freshness: f64,
    /// Independence of the evidence producer from the assessed entity.
    pub independence: f64,
    /// Internal consistency of results across controls (penalised by the
    /// all-pass bias flag).
    pub consistency: f64,
}

/// Pass/fail/test-count rollup for the credential subject.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Summary {
    /// Total controls tested.
    pub controls_tested: u32,
    /// Controls that passed (`status = effective`).
    pub controls_passed: u32,
    /// Controls that failed (`status = ineffective`).
    pub controls_failed: u32,
    /// `round(100 * controls_passed / controls_tested)`, or 0 when
    /// `controls_tested == 0`.
    pub overall_score: u32,
}

/// Per-control classification flags (non-blocking, surfaced for review).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ControlClassification {
    /// The control this classification applies to.
    pub control_id: String,
    /// Flags raised for this control (e.g. `"generic-boilerplate"`).
    pub flags: Vec<String>,
}

/// Per-framework control coverage table entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FrameworkCoverage {
    /// Number of controls mapped into this framework.
    pub controls_mapped: u32,
    /// Of those, how many passed.
    pub passed: u32,
    /// Of those, how many failed.
    pub failed: u32,
    /// The framework's own control identifiers covered.
    pub controls: Vec<String>,
    /// Of `controls`, the ones whose source control was `ineffective`.
    /// Lets the Diff Engine report `newFailures`/`resolvedFailures` at the
    /// `(framework, controlId)` granularity without re-deriving it from a
    /// raw document.
    #[serde(default)]
    pub failed_controls: Vec<String>,
}

/// The W3C Verifiable Credential's `credentialSubject` payload.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CredentialSubject {
    /// Subject type tag (mirrors the outer VC `type` array's domain member).
    #[serde(rename = "type")]
    pub subject_type: String,
    /// Human-readable scope description.
    pub scope: String,
    /// Derived assurance claim.
    pub assurance: AssuranceClaim,
    /// Evidence provenance.
    pub provenance: Provenance,
    /// Pass/fail/score rollup.
    pub summary: Summary,
    /// Seven quality dimensions.
    pub dimensions: Dimensions,
    /// Distinct evidence types observed across controls.
    pub evidence_types: Vec<String>,
    /// The calendar window the assessment covered.
    pub observation_period: ObservationPeriod,
    /// Per-control classification flags.
    pub control_classifications: Vec<ControlClassification>,
    /// Human-readable label for how deep the assessment went.
    pub assessment_depth: String,
    /// 0–100 composite score for how trustworthy the provenance is.
    pub provenance_quality: f64,
    /// DORA-style freshness/specificity/independence/reproducibility scores.
    pub dora_metrics: DoraMetrics,
    /// Beta-PERT/FAIR risk quantification.
    pub risk_quantification: RiskQuantification,
    /// Per-framework control coverage, keyed by framework name.
    pub frameworks: BTreeMap<String, FrameworkCoverage>,
}
