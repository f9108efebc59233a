// SPDX-License-Identifier: MIT OR Apache-2.0
//! Assurance claim, provenance, observation period, and DORA/risk types.
//!
//! These are produced by the Assurance Calculator and carried verbatim into
//! the [`crate::credential::CredentialSubject`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A five-step assurance scale from Documented (L0) to Attested (L4).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct AssuranceLevel(u8);

impl AssuranceLevel {
    /// L0 — Documented.
    pub const L0: Self = Self(0);
    /// L1 — Configured.
    pub const L1: Self = Self(1);
    /// L2 — Demonstrated.
    pub const L2: Self = Self(2);
    /// L3 — Observed.
    pub const L3: Self = Self(3);
    /// L4 — Attested.
    pub const L4: Self = Self(4);

    /// Construct a level from its numeric value (0–4).
    ///
    /// # Errors
    ///
    /// Returns the out-of-range value if `n > 4`.
    pub fn new(n: u8) -> Result<Self, u8> {
        if n <= 4 {
            Ok(Self(n))
        } else {
            Err(n)
        }
    }

    /// The raw numeric value (0–4).
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Human-readable label for this level.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "Documented",
            1 => "Configured",
            2 => "Demonstrated",
            3 => "Observed",
            _ => "Attested",
        }
    }
}

impl TryFrom<u8> for AssuranceLevel {
    type Error = u8;
    fn try_from(n: u8) -> Result<Self, u8> {
        Self::new(n)
    }
}

impl From<AssuranceLevel> for u8 {
    fn from(level: AssuranceLevel) -> u8 {
        level.0
    }
}

impl fmt::Display for AssuranceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{} ({})", self.0, self.label())
    }
}

/// How the declared assurance level was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// The assessed entity evaluated itself.
    SelfAssessed,
    /// An automated scanner or tool produced the evidence.
    ToolAttested,
    /// An independent third party produced the evidence (not a licensed auditor).
    ThirdParty,
    /// A licensed/accredited auditor attested to the evidence.
    AuditorAttested,
}

/// The derived assurance claim for a CPOE.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssuranceClaim {
    /// The declared level (0–4).
    pub declared: AssuranceLevel,
    /// How the declared level was reached.
    pub method: Method,
    /// Whether every in-scope control met the declared level's ceiling.
    pub verified: bool,
    /// Count of in-scope controls at each assigned level.
    pub breakdown: BTreeMap<AssuranceLevel, u32>,
    /// Ordered, deterministic audit trail of every decision made.
    pub rule_trace: Vec<String>,
    /// Opaque version tag for the calculator's rule set.
    pub calculation_version: String,
}

/// Who produced the evidence underlying a CPOE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProvenanceSource {
    /// The assessed entity itself.
    SelfSource,
    /// An automated tool or scanner.
    Tool,
    /// A licensed auditor.
    Auditor,
}

/// Provenance of the evidence underlying a CPOE.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Provenance {
    /// Who produced the evidence.
    pub source: ProvenanceSource,
    /// Named identity of the source (auditor firm, scanner product), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_identity: Option<String>,
    /// Date the evidence was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_date: Option<NaiveDate>,
    /// Fraction of controls (summing to 1.0) backed by each evidence type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_type_distribution: Option<BTreeMap<String, f64>>,
}

/// Classification of the calendar window an assessment covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CosoClassification {
    /// The assessment evaluated control design only.
    Design,
    /// The assessment evaluated control operation over the period.
    Operating,
}

/// Minimum duration, in days, for an observation period to be `sufficient`.
pub const SUFFICIENT_OBSERVATION_DAYS: i64 = 90;

/// The calendar window over which an assessment was conducted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ObservationPeriod {
    /// Start of the window.
    pub start_date: NaiveDate,
    /// End of the window.
    pub end_date: NaiveDate,
    /// `end_date - start_date` in days.
    pub duration_days: i64,
    /// Whether `duration_days >= 90`.
    pub sufficient: bool,
    /// COSO-style design/operating classification.
    pub coso_classification: CosoClassification,
    /// Human-readable SOC 2 equivalent label (e.g. `"Type II equivalent"`).
    pub soc2_equivalent: String,
}

impl ObservationPeriod {
    /// Derive an [`ObservationPeriod`] from a start/end date pair.
    #[must_use]
    pub fn from_dates(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let duration_days = (end_date - start_date).num_days().max(0);
        let sufficient = duration_days >= SUFFICIENT_OBSERVATION_DAYS;
        let coso_classification = if sufficient {
            CosoClassification::Operating
        } else {
            CosoClassification::Design
        };
        let soc2_equivalent = if sufficient {
            "Type II equivalent".to_string()
        } else {
            "Type I equivalent".to_string()
        };
        Self {
            start_date,
            end_date,
            duration_days,
            sufficient,
            coso_classification,
            soc2_equivalent,
        }
    }
}

/// Composite assurance band for [`DoraMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DoraBand {
    /// Low composite assurance.
    Low,
    /// Medium composite assurance.
    Medium,
    /// High composite assurance.
    High,
}

/// Four 0–100 digital-operational-resilience scores, plus a composite band.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DoraMetrics {
    /// How recent the evidence is.
    pub freshness: f64,
    /// How specific (vs. boilerplate) the evidence is.
    pub specificity: f64,
    /// How independent of the assessed entity the evidence producer is.
    pub independence: f64,
    /// How re-verifiable the evidence is after the fact.
    pub reproducibility: f64,
    /// Composite band derived from the four scores.
    pub band: DoraBand,
    /// Human-readable flags for notable score pairings (e.g. "high
    /// freshness + low reproducibility: evidence refreshed but cannot be
    /// re-verified").
    #[serde(default)]
    pub pairing_flags: Vec<String>,
}

/// A Beta-PERT three-point estimate (minimum, most likely, maximum).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct PertEstimate {
    /// Optimistic (minimum) estimate.
    pub min: f64,
    /// Most likely estimate.
    pub most_likely: f64,
    /// Pessimistic (maximum) estimate.
    pub max: f64,
}

impl PertEstimate {
    /// The Beta-PERT expected value: `(min + 4*most_likely + max) / 6`.
    #[must_use]
    pub fn expected_value(self) -> f64 {
        (self.min + 4.0 * self.most_likely + self.max) / 6.0
    }
}

/// A coarse FAIR (Factor Analysis of Information Risk) mapping: a
/// loss-event-frequency × loss-magnitude estimate, each expressed as a
/// Beta-PERT distribution in annualised-loss-expectancy dollars.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FairMapping {
    /// Estimated frequency (events per year) of a loss event, in [0, 1]
    /// when treated as a probability for a single control failure.
    pub loss_event_frequency: PertEstimate,
    /// Estimated magnitude (USD) of a single loss event.
    pub loss_magnitude_usd: PertEstimate,
}

impl FairMapping {
    /// Annualised loss expectancy: expected frequency × expected magnitude.
    #[must_use]
    pub fn annualized_loss_expectancy(&self) -> f64 {
        self.loss_event_frequency.expected_value() * self.loss_magnitude_usd.expected_value()
    }
}

/// Beta-PERT risk estimate plus its FAIR mapping.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RiskQuantification {
    /// The Beta-PERT estimate driving the FAIR mapping below.
    pub beta_pert: PertEstimate,
    /// The derived FAIR frequency/magnitude mapping.
    pub fair: FairMapping,
}
