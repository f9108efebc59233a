// SPDX-License-Identifier: MIT OR Apache-2.0
//! The canonical ingested-document shape, independent of source format.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status a single control was found to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// The control operated as intended.
    Effective,
    /// The control did not operate as intended.
    Ineffective,
    /// The control was in scope but not tested.
    NotTested,
}

/// Severity assigned to a control (driven by the source's own scale).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Lowest severity.
    Low,
    /// Medium severity.
    Medium,
    /// High severity.
    High,
    /// Highest severity.
    Critical,
}

/// A reference from one control to a named framework's own control catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FrameworkRef {
    /// Framework name (e.g. `"SOC2"`, `"NIST-800-53"`, `"ISO27001"`).
    pub framework: String,
    /// The framework's own control identifier.
    pub control_id: String,
    /// Human-readable control name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_name: Option<String>,
}

/// One tested control, as extracted by the Mapping Registry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IngestedControl {
    /// Unique identifier within the document.
    pub id: String,
    /// Free-text description of what the control covers.
    pub description: String,
    /// Test status.
    pub status: Status,
    /// Severity, as reported by (or inferred for) the source.
    pub severity: Severity,
    /// Free-text evidence narrative, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// Cross-framework references for this control.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub framework_refs: Vec<FrameworkRef>,
}

/// Document-level metadata, independent of control content.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentMetadata {
    /// Report title.
    pub title: String,
    /// Issuing organisation or tool.
    pub issuer: String,
    /// ISO-8601 date the assessment was produced.
    pub date: NaiveDate,
    /// Human-readable scope description.
    pub scope: String,
    /// Named auditor, if a third party performed the assessment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auditor: Option<String>,
    /// Report type (e.g. `"SOC 2 Type II"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_type: Option<String>,
    /// SHA-256 of the raw source text, when the source was free text (e.g.
    /// an LLM-extracted PDF).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text_hash: Option<String>,
}

/// Free-form assessment narrative attached to a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AssessmentContext {
    /// Technologies observed in scope.
    #[serde(default)]
    pub tech_stack: Vec<String>,
    /// Compensating controls named by the assessor.
    #[serde(default)]
    pub compensating_controls: Vec<String>,
    /// Gaps called out by the assessor.
    #[serde(default)]
    pub gaps: Vec<String>,
    /// Human-readable scope coverage note.
    #[serde(default)]
    pub scope_coverage: String,
    /// Free-text assessor notes.
    #[serde(default)]
    pub assessor_notes: String,
}

/// The canonical representation of a completed assessment, independent of
/// source format.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IngestedDocument {
    /// Discriminator identifying the originating evidence kind (e.g.
    /// `"soc2"`, `"prowler"`, `"security-hub"`, `"inspec"`, `"trivy"`,
    /// `"gitlab"`, `"generic"`). Intentionally an open string, not a closed
    /// enum: new sources are added as mapping-pack data, not code.
    pub source: String,
    /// Document-level metadata.
    pub metadata: DocumentMetadata,
    /// Ordered sequence of tested controls.
    pub controls: Vec<IngestedControl>,
    /// Optional free-form assessment narrative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_context: Option<AssessmentContext>,
}

/// Errors raised by [`IngestedDocument::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestionError {
    /// Two or more controls share the same `id`.
    #[error("duplicate control id: {id}")]
    DuplicateControlId {
        /// The duplicated identifier.
        id: String,
    },
    /// A framework reference is missing `framework` or `control_id`.
    #[error("control {control_id} has a framework reference missing framework or control_id")]
    IncompleteFrameworkRef {
        /// The control whose reference is incomplete.
        control_id: String,
    },
}

impl IngestedDocument {
    /// Validate the data-model invariants I1–I3 from the specification.
    ///
    /// I4 (`metadata.date` is a valid ISO-8601 date) is enforced by the
    /// type system: [`DocumentMetadata::date`] is a [`NaiveDate`], which
    /// cannot be constructed from an invalid calendar date.
    ///
    /// # Errors
    ///
    /// Returns the first invariant violation found.
    pub fn validate(&self) -> Result<(), IngestionError> {
        let mut seen = BTreeMap::new();
        for control in &self.controls {
            if seen.insert(control.id.clone(), ()).is_some() {
                return Err(IngestionError::DuplicateControlId {
                    id: control.id.clone(),
                });
            }
            for r in &control.framework_refs {
                if r.framework.is_empty() || r.control_id.is_empty() {
                    return Err(IngestionError::IncompleteFrameworkRef {
                        control_id: control.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
