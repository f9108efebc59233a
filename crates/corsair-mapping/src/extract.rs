// SPDX-License-Identifier: MIT OR Apache-2.0
//! Apply a matched [`MappingRule`] to an input document, producing an
//! [`IngestedDocument`].

use chrono::NaiveDate;
use serde_json::Value;

use corsair_core::{
    AssessmentContext, DocumentMetadata, FrameworkRef, IngestedControl, IngestedDocument,
    Severity, Status,
};

use crate::path::{resolve, resolve_str};
use crate::rule::{MappingError, MappingRule, MetadataField};

/// The result of successfully applying a mapping: the extracted document,
/// plus a warning if zero controls were extracted even though the mapping
/// declares a `controls.path`.
#[derive(Debug, Clone)]
pub struct ExtractOutcome {
    /// The extracted document.
    pub document: IngestedDocument,
    /// Non-fatal warnings surfaced to the caller (e.g. "zero controls").
    pub warnings: Vec<String>,
}

/// Apply `rule` to `input`, producing an [`IngestedDocument`].
///
/// A match whose control extraction yields zero controls is reported as a
/// warning, not a failure.
///
/// # Errors
///
/// Returns [`MappingError::InvalidInput`] if a required metadata field
/// cannot be resolved.
pub fn apply(rule: &MappingRule, input: &Value) -> Result<ExtractOutcome, MappingError> {
    let mut warnings = Vec::new();

    let metadata = extract_metadata(rule, input)?;
    let controls = match &rule.controls {
        Some(spec) => extract_controls(spec, input),
        None => Vec::new(),
    };
    if rule.controls.is_some() && controls.is_empty() {
        warnings.push(format!(
            "mapping `{}` matched but extracted zero controls",
            rule.id
        ));
    }
    let assessment_context = extract_passthrough(rule, input);

    let document = IngestedDocument {
        source: rule.source.clone().unwrap_or_else(|| "generic".to_string()),
        metadata,
        controls,
        assessment_context,
    };

    Ok(ExtractOutcome { document, warnings })
}

fn extract_metadata(
    rule: &MappingRule,
    input: &Value,
) -> Result<DocumentMetadata, MappingError> {
    let get = |key: &str, default: &str| -> String {
        rule.metadata
            .get(key)
            .and_then(|f| resolve_field(f, input))
            .unwrap_or_else(|| default.to_string())
    };
    let date_str = get("date", "");
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .or_else(|_| {
            chrono::DateTime::parse_from_rfc3339(&date_str).map(|dt| dt.date_naive())
        })
        .map_err(|_| MappingError::InvalidInput {
            reason: format!("mapping `{}`: metadata.date `{date_str}` is not a valid date", rule.id),
        })?;

    Ok(DocumentMetadata {
        title: get("title", "Untitled Assessment"),
        issuer: get("issuer", "unknown"),
        date,
        scope: get("scope", ""),
        auditor: rule.metadata.get("auditor").and_then(|f| resolve_field(f, input)),
        report_type: rule.metadata.get("reportType").and_then(|f| resolve_field(f, input)),
        raw_text_hash: rule.metadata.get("rawTextHash").and_then(|f| resolve_field(f, input)),
    })
}

fn resolve_field(field: &MetadataField, input: &Value) -> Option<String> {
    match field {
        MetadataField::Literal(s) => Some(s.clone()),
        MetadataField::Path(p) => resolve_str(input, p),
    }
}

fn extract_controls(spec: &crate::rule::ControlsSpec, input: &Value) -> Vec<IngestedControl> {
    let Some(Value::Array(entries)) = resolve(input, &spec.path) else {
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let id = spec
                .id_path
                .as_deref()
                .and_then(|p| resolve_str(entry, p))
                .unwrap_or_else(|| format!("control-{i}"));
            let description = spec
                .description_path
                .as_deref()
                .and_then(|p| resolve_str(entry, p))
                .unwrap_or_default();
            let status = spec
                .status_path
                .as_deref()
                .and_then(|p| resolve_str(entry, p))
                .map(|raw| map_status(&raw, spec.status_map.as_ref()))
                .unwrap_or(Status::NotTested);
            let severity = spec
                .severity_path
                .as_deref()
                .and_then(|p| resolve_str(entry, p))
                .map(|raw| map_severity(&raw, spec.severity_map.as_ref()))
                .unwrap_or(Severity::Medium);
            let evidence = spec
                .evidence_path
                .as_deref()
                .and_then(|p| resolve_str(entry, p));
            let framework_refs = spec
                .framework_refs
                .as_ref()
                .map(|fr| extract_framework_refs(fr, entry))
                .unwrap_or_default();

            IngestedControl {
                id,
                description,
                status,
                severity,
                evidence,
                framework_refs,
            }
        })
        .collect()
}

fn map_status(raw: &str, map: Option<&crate::rule::StatusMap>) -> Status {
    let mapped = map.and_then(|m| m.get(raw)).map(String::as_str).unwrap_or(raw);
    match mapped {
        "effective" => Status::Effective,
        "ineffective" => Status::Ineffective,
        _ => Status::NotTested,
    }
}

fn map_severity(raw: &str, map: Option<&crate::rule::SeverityMap>) -> Severity {
    let mapped = map.and_then(|m| m.get(raw)).map(String::as_str).unwrap_or(raw);
    match mapped {
        "CRITICAL" => Severity::Critical,
        "HIGH" => Severity::High,
        "LOW" => Severity::Low,
        _ => Severity::Medium,
    }
}

fn extract_framework_refs(
    spec: &crate::rule::FrameworkRefsSpec,
    entry: &Value,
) -> Vec<FrameworkRef> {
    let Some(Value::Array(refs)) = resolve(entry, &spec.path) else {
        return Vec::new();
    };
    refs.iter()
        .filter_map(|r| {
            let framework = spec
                .framework_path
                .as_deref()
                .and_then(|p| resolve_str(r, p))?;
            let control_id = spec
                .control_id_path
                .as_deref()
                .and_then(|p| resolve_str(r, p))?;
            let control_name = spec
                .control_name_path
                .as_deref()
                .and_then(|p| resolve_str(r, p));
            Some(FrameworkRef {
                framework,
                control_id,
                control_name,
            })
        })
        .collect()
}

fn extract_passthrough(rule: &MappingRule, input: &Value) -> Option<AssessmentContext> {
    let spec = rule.passthrough.as_ref()?;
    if spec.paths.is_empty() {
        return None;
    }
    let mut ctx = AssessmentContext::default();
    for (key, path) in &spec.paths {
        let Some(value) = resolve_str(input, path) else {
            continue;
        };
        match key.as_str() {
            "scopeCoverage" => ctx.scope_coverage = value,
            "assessorNotes" => ctx.assessor_notes = value,
            "techStack" => ctx.tech_stack.push(value),
            "compensatingControls" => ctx.compensating_controls.push(value),
            "gaps" => ctx.gaps.push(value),
            _ => {}
        }
    }
    Some(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{ControlsSpec, MatchPredicate};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn rule() -> MappingRule {
        MappingRule {
            id: "aws-config".into(),
            name: None,
            source: Some("tool".into()),
            priority: 0,
            match_predicate: MatchPredicate {
                all_of: vec!["findings".into()],
                any_of: vec![],
            },
            metadata: BTreeMap::from([
                ("title".into(), MetadataField::Literal("AWS Config Report".into())),
                ("issuer".into(), MetadataField::Literal("aws-config".into())),
                ("date".into(), MetadataField::Path("reportDate".into())),
                ("scope".into(), MetadataField::Literal("prod account".into())),
            ]),
            controls: Some(ControlsSpec {
                path: "findings".into(),
                id_path: Some("ruleId".into()),
                description_path: Some("desc".into()),
                status_path: Some("compliance".into()),
                status_map: Some(BTreeMap::from([
                    ("COMPLIANT".into(), "effective".into()),
                    ("NON_COMPLIANT".into(), "ineffective".into()),
                ])),
                severity_path: None,
                severity_map: None,
                evidence_path: None,
                framework_refs: None,
            }),
            passthrough: None,
        }
    }

    #[test]
    fn extracts_controls_with_mapped_status() {
        let input = json!({
            "reportDate": "2026-02-01",
            "findings": [
                {"ruleId": "r1", "desc": "MFA required", "compliance": "COMPLIANT"},
                {"ruleId": "r2", "desc": "Root key rotated", "compliance": "NON_COMPLIANT"},
            ]
        });
        let outcome = apply(&rule(), &input).unwrap();
        assert_eq!(outcome.document.controls.len(), 2);
        assert_eq!(outcome.document.controls[0].status, Status::Effective);
        assert_eq!(outcome.document.controls[1].status, Status::Ineffective);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn zero_controls_is_a_warning_not_error() {
        let input = json!({"reportDate": "2026-02-01", "findings": []});
        let outcome = apply(&rule(), &input).unwrap();
        assert!(outcome.document.controls.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
    }
}
