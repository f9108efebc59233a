// SPDX-License-Identifier: MIT OR Apache-2.0
//! Declarative mapping rule shapes.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Errors that can occur while loading or applying a mapping rule.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum MappingError {
    /// The mapping failed schema validation at load time.
    #[error("mapping `{id}` is invalid: {reason}")]
    SchemaInvalid {
        /// The offending mapping's id.
        id: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The mapping file could not be parsed as JSON.
    #[error("failed to parse mapping file `{path}`: {reason}")]
    ParseError {
        /// Path of the file that failed to parse.
        path: String,
        /// Underlying parse error detail.
        reason: String,
    },
    /// A signed pack's signature did not verify.
    #[error("signed pack `{id}` failed signature verification")]
    SignatureInvalid {
        /// The pack's declared id.
        id: String,
    },
    /// Invalid input was provided to the registry.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Reason the input is invalid.
        reason: String,
    },
}

/// Presence predicate over the input document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MatchPredicate {
    /// Every path listed must be present.
    #[serde(default, rename = "allOf")]
    pub all_of: Vec<String>,
    /// At least one listed path must be present, when non-empty.
    #[serde(default, rename = "anyOf")]
    pub any_of: Vec<String>,
}

/// A single metadata field: either a literal string or a `*Path` pointer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum MetadataField {
    /// A dotted-path pointer into the input document, resolved at extract
    /// time. Convention: the registry key ends in `Path`.
    Path(String),
    /// A literal value copied verbatim.
    Literal(String),
}

/// How `status` values in the input map onto [`corsair_core::Status`].
pub type StatusMap = BTreeMap<String, String>;
/// How `severity` values in the input map onto [`corsair_core::Severity`].
pub type SeverityMap = BTreeMap<String, String>;

/// Framework-reference extraction spec nested under [`ControlsSpec`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct FrameworkRefsSpec {
    /// Path to the array of framework references for a control.
    pub path: String,
    /// Path (relative to each entry) to the framework name.
    #[serde(default, rename = "frameworkPath")]
    pub framework_path: Option<String>,
    /// Path (relative to each entry) to the control id within that
    /// framework.
    #[serde(default, rename = "controlIdPath")]
    pub control_id_path: Option<String>,
    /// Path (relative to each entry) to the control's human-readable name.
    #[serde(default, rename = "controlNamePath")]
    pub control_name_path: Option<String>,
}

/// Control-array extraction spec.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ControlsSpec {
    /// Path to the array of controls in the input document.
    pub path: String,
    /// Path (relative to each entry) to the control id.
    #[serde(default, rename = "idPath")]
    pub id_path: Option<String>,
    /// Path (relative to each entry) to the control description.
    #[serde(default, rename = "descriptionPath")]
    pub description_path: Option<String>,
    /// Path (relative to each entry) to the raw status value.
    #[serde(default, rename = "statusPath")]
    pub status_path: Option<String>,
    /// Mapping from raw status values to `{effective, ineffective,
    /// not-tested}`.
    #[serde(default, rename = "statusMap")]
    pub status_map: Option<StatusMap>,
    /// Path (relative to each entry) to the raw severity value.
    #[serde(default, rename = "severityPath")]
    pub severity_path: Option<String>,
    /// Mapping from raw severity values to `{CRITICAL, HIGH, MEDIUM, LOW}`.
    #[serde(default, rename = "severityMap")]
    pub severity_map: Option<SeverityMap>,
    /// Path (relative to each entry) to evidence text/URIs.
    #[serde(default, rename = "evidencePath")]
    pub evidence_path: Option<String>,
    /// Framework-reference extraction, if present.
    #[serde(default, rename = "frameworkRefs")]
    pub framework_refs: Option<FrameworkRefsSpec>,
}

/// Small-field passthrough into `assessmentContext`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PassthroughSpec {
    /// Map of destination key to source dotted path.
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
}

/// A single declarative mapping.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MappingRule {
    /// Unique mapping id.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,
    /// Source discriminator this mapping is associated with.
    #[serde(default)]
    pub source: Option<String>,
    /// Higher priority wins ties; default 0.
    #[serde(default)]
    pub priority: i64,
    /// Presence predicate determining whether this mapping matches an
    /// input document.
    #[serde(rename = "match")]
    pub match_predicate: MatchPredicate,
    /// Metadata fields to extract.
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataField>,
    /// Control-array extraction, if this mapping extracts controls.
    #[serde(default)]
    pub controls: Option<ControlsSpec>,
    /// Small-field passthrough into `assessmentContext`.
    #[serde(default)]
    pub passthrough: Option<PassthroughSpec>,
}

/// Recognised `statusMap` target values.
pub const VALID_STATUS_TARGETS: &[&str] = &["effective", "ineffective", "not-tested"];
/// Recognised `severityMap` target values.
pub const VALID_SEVERITY_TARGETS: &[&str] = &["CRITICAL", "HIGH", "MEDIUM", "LOW"];

impl MappingRule {
    /// Validate this mapping against the schema rules from the registry
    /// design: `id` must be non-empty, at least one of `allOf`/`anyOf`
    /// must be non-empty, `controls.path` must be set if `controls` is
    /// present, and map targets must lie in the recognised vocabularies.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::SchemaInvalid`] describing the first
    /// violation found.
    pub fn validate(&self) -> Result<(), MappingError> {
        if self.id.is_empty() {
            return Err(MappingError::SchemaInvalid {
                id: self.id.clone(),
                reason: "id must not be empty".into(),
            });
        }
        if self.match_predicate.all_of.is_empty() && self.match_predicate.any_of.is_empty() {
            return Err(MappingError::SchemaInvalid {
                id: self.id.clone(),
                reason: "match.allOf or match.anyOf must be non-empty".into(),
            });
        }
        if let Some(controls) = &self.controls {
            if controls.path.is_empty() {
                return Err(MappingError::SchemaInvalid {
                    id: self.id.clone(),
                    reason: "controls.path must be set when controls is present".into(),
                });
            }
            if let Some(map) = &controls.status_map {
                for target in map.values() {
                    if !VALID_STATUS_TARGETS.contains(&target.as_str()) {
                        return Err(MappingError::SchemaInvalid {
                            id: self.id.clone(),
                            reason: format!("statusMap target '{target}' is not recognised"),
                        });
                    }
                }
            }
            if let Some(map) = &controls.severity_map {
                for target in map.values() {
                    if !VALID_SEVERITY_TARGETS.contains(&target.as_str()) {
                        return Err(MappingError::SchemaInvalid {
                            id: self.id.clone(),
                            reason: format!("severityMap target '{target}' is not recognised"),
                        });
                    }
                }
            }
        }
        let has_controls = self.controls.is_some();
        let has_passthrough = self
            .passthrough
            .as_ref()
            .is_some_and(|p| !p.paths.is_empty());
        if !has_controls && !has_passthrough {
            return Err(MappingError::SchemaInvalid {
                id: self.id.clone(),
                reason: "mapping must declare controls.path or passthrough.paths".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_rule() -> MappingRule {
        MappingRule {
            id: "aws-config".into(),
            name: None,
            source: Some("tool".into()),
            priority: 0,
            match_predicate: MatchPredicate {
                all_of: vec!["findings".into()],
                any_of: vec![],
            },
            metadata: BTreeMap::new(),
            controls: Some(ControlsSpec {
                path: "findings".into(),
                id_path: Some("id".into()),
                description_path: None,
                status_path: Some("status".into()),
                status_map: Some(BTreeMap::from([("PASS".into(), "effective".into())])),
                severity_path: None,
                severity_map: None,
                evidence_path: None,
                framework_refs: None,
            }),
            passthrough: None,
        }
    }

    #[test]
    fn valid_rule_passes() {
        assert!(base_rule().validate().is_ok());
    }

    #[test]
    fn empty_match_predicate_rejected() {
        let mut r = base_rule();
        r.match_predicate = MatchPredicate::default();
        assert!(r.validate().is_err());
    }

    #[test]
    fn controls_without_path_rejected() {
        let mut r = base_rule();
        r.controls.as_mut().unwrap().path = String::new();
        assert!(r.validate().is_err());
    }

    #[test]
    fn unrecognised_status_target_rejected() {
        let mut r = base_rule();
        r.controls.as_mut().unwrap().status_map =
            Some(BTreeMap::from([("PASS".into(), "ok".into())]));
        assert!(r.validate().is_err());
    }

    #[test]
    fn rule_with_neither_controls_nor_passthrough_rejected() {
        let mut r = base_rule();
        r.controls = None;
        assert!(r.validate().is_err());
    }
}
