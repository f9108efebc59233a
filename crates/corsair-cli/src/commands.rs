// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared command implementations for the Corsair CLI.
//!
//! These functions are kept free of the clap layer so they can be tested
//! without spawning the binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine as _;
use chrono::NaiveDate;
use ed25519_dalek::VerifyingKey;
use rand::RngCore;

use corsair_core::{IngestedDocument, Provenance, ProvenanceSource};
use corsair_mapping::MappingRegistry;
use corsair_policy::{PolicyPredicate, PredicateParseError};

/// Default key directory, `~/.corsair/keys/`, falling back to `.corsair/keys`
/// when `HOME` is unset (e.g. in a stripped-down container).
#[must_use]
pub fn default_key_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home).join(".corsair").join("keys"),
        _ => PathBuf::from(".corsair").join("keys"),
    }
}

/// Read `file`'s contents, or all of stdin if `file` is `None`.
pub fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("read '{}'", path.display()))
        }
        None => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read evidence from stdin")?;
            Ok(buf)
        }
    }
}

/// Turn the CLI's `--policy` strings plus its named convenience flags into
/// one ordered list of [`PolicyPredicate`]s.
#[allow(clippy::too_many_arguments)]
pub fn build_policy_predicates(
    policy_flags: &[String],
    require_issuer: Option<&str>,
    require_framework: Option<&str>,
    max_age: Option<u32>,
    min_score: Option<u32>,
    require_source: Option<&str>,
    require_scitt: bool,
    dependencies: bool,
    dependency_depth: Option<u32>,
) -> Result<Vec<PolicyPredicate>, PredicateParseError> {
    let mut predicates = Vec::with_capacity(policy_flags.len() + 8);
    for raw in policy_flags {
        predicates.push(PolicyPredicate::parse(raw)?);
    }
    if let Some(v) = require_issuer {
        predicates.push(PolicyPredicate::parse(&format!("require-issuer={v}"))?);
    }
    if let Some(v) = require_framework {
        predicates.push(PolicyPredicate::parse(&format!("require-framework={v}"))?);
    }
    if let Some(v) = max_age {
        predicates.push(PolicyPredicate::parse(&format!("max-age={v}"))?);
    }
    if let Some(v) = min_score {
        predicates.push(PolicyPredicate::parse(&format!("min-score={v}"))?);
    }
    if let Some(v) = require_source {
        predicates.push(PolicyPredicate::parse(&format!("require-source={v}"))?);
    }
    if require_scitt {
        predicates.push(PolicyPredicate::parse("require-scitt")?);
    }
    if let Some(depth) = dependency_depth {
        predicates.push(PolicyPredicate::parse(&format!("dependency-depth={depth}"))?);
    } else if dependencies {
        predicates.push(PolicyPredicate::parse("dependencies")?);
    }
    Ok(predicates)
}

/// Ingest raw evidence JSON into an [`IngestedDocument`], either directly
/// (the JSON already matches the shape) or through a mapping rule/pack
/// loaded from `mapping_path` (a single file or a directory of packs).
///
/// Returns the document alongside whether a mapping was actually applied
/// (used to label `assessment_depth`).
pub fn ingest_evidence(content: &str, mapping_path: Option<&Path>) -> Result<(IngestedDocument, bool)> {
    let value: serde_json::Value = serde_json::from_str(content).context("parse evidence JSON")?;

    let Some(mapping_path) = mapping_path else {
        let document: IngestedDocument =
            serde_json::from_value(value).context("evidence does not match the IngestedDocument shape; pass --mapping to extract it")?;
        document.validate().context("validate ingested document")?;
        return Ok((document, false));
    };

    let mut registry = MappingRegistry::new();
    if mapping_path.is_dir() {
        let errors = registry
            .load_dir(mapping_path)
            .with_context(|| format!("load mapping directory '{}'", mapping_path.display()))?;
        for e in &errors {
            tracing::warn!("mapping load error: {e}");
        }
    } else {
        registry
            .load_file(mapping_path)
            .with_context(|| format!("load mapping file '{}'", mapping_path.display()))?;
    }

    let (_rule, outcome) = registry.ingest(&value).context("apply mapping to evidence")?;
    for w in &outcome.warnings {
        tracing::warn!("{w}");
    }
    outcome.document.validate().context("validate ingested document")?;
    Ok((outcome.document, true))
}

/// Derive [`Provenance`] from a document's own metadata. The CLI's
/// evidence table carries no explicit `--source`/`--source-identity`
/// flags, so provenance is inferred: a declared auditor implies
/// auditor-attested evidence, otherwise evidence that passed through a
/// mapping pack is treated as tool-attested, and anything else is treated
/// as self-attested.
#[must_use]
pub fn derive_provenance(document: &IngestedDocument, mapping_used: bool) -> Provenance {
    let source = if document.metadata.auditor.is_some() {
        ProvenanceSource::Auditor
    } else if mapping_used {
        ProvenanceSource::Tool
    } else {
        ProvenanceSource::SelfSource
    };
    Provenance {
        source,
        source_identity: document
            .metadata
            .auditor
            .clone()
            .or_else(|| Some(document.metadata.issuer.clone())),
        source_date: Some(document.metadata.date),
        evidence_type_distribution: None,
    }
}

/// Human-readable assessment-depth label, preferring the document's own
/// declared report type.
#[must_use]
pub fn assessment_depth_label(document: &IngestedDocument, mapping_used: bool) -> String {
    if let Some(report_type) = &document.metadata.report_type {
        return report_type.clone();
    }
    if mapping_used {
        "mapped-extraction".to_string()
    } else {
        "direct-ingestion".to_string()
    }
}

/// The observation window the CLI derives for a signed CPOE: from the
/// document's own evidence date through the signing date.
#[must_use]
pub fn observation_period_for(document: &IngestedDocument, today: NaiveDate) -> corsair_core::ObservationPeriod {
    let start = document.metadata.date;
    let end = if today >= start { today } else { start };
    corsair_core::ObservationPeriod::from_dates(start, end)
}

/// Load an explicit Ed25519 public key from a file in the `ed25519.pub`
/// format written by [`corsair_keys::KeyManager`]: base64-standard,
/// 32 raw bytes, no PEM wrapper.
pub fn load_explicit_pubkey(path: &Path) -> Result<VerifyingKey> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read public key '{}'", path.display()))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(content.trim())
        .context("public key file is not valid base64")?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected a 32-byte Ed25519 public key"))?;
    VerifyingKey::from_bytes(&arr).context("public key bytes do not form a valid Ed25519 point")
}

/// Generate `count` random URL-safe salts for SD-JWT disclosures.
#[must_use]
pub fn random_salts(count: usize) -> Vec<String> {
    let mut rng = rand::rngs::OsRng;
    (0..count)
        .map(|_| {
            let mut bytes = [0u8; 16];
            rng.fill_bytes(&mut bytes);
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
        })
        .collect()
}

/// Parse a policy artefact file: a JSON array of predicate strings in the
/// same syntax accepted by `--policy`.
pub fn parse_policy_file(content: &str) -> Result<Vec<PolicyPredicate>> {
    let raw: Vec<String> =
        serde_json::from_str(content).context("policy file must be a JSON array of predicate strings")?;
    raw.iter()
        .map(|s| PolicyPredicate::parse(s).map_err(|e| anyhow::anyhow!("{e}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use corsair_core::{AssessmentContext, DocumentMetadata};

    fn sample_document(auditor: Option<&str>) -> IngestedDocument {
        IngestedDocument {
            source: "generic".to_string(),
            metadata: DocumentMetadata {
                title: "Q2 Assessment".to_string(),
                issuer: "Acme Corp".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                scope: "prod account".to_string(),
                auditor: auditor.map(String::from),
                report_type: None,
                raw_text_hash: None,
            },
            controls: vec![],
            assessment_context: Some(AssessmentContext::default()),
        }
    }

    #[test]
    fn build_policy_predicates_combines_flags_and_convenience_options() {
        let predicates = build_policy_predicates(
            &["require-receipts".to_string()],
            Some("did:web:issuer.example"),
            Some("SOC2,PCI-DSS"),
            Some(30),
            Some(80),
            None,
            true,
            false,
            None,
        )
        .unwrap();
        assert_eq!(predicates.len(), 6);
        assert_eq!(predicates[0], PolicyPredicate::RequireReceipts);
        assert_eq!(predicates[1], PolicyPredicate::RequireIssuer("did:web:issuer.example".to_string()));
        assert_eq!(predicates[5], PolicyPredicate::RequireScitt);
    }

    #[test]
    fn dependency_depth_wins_over_bare_dependencies_flag() {
        let predicates = build_policy_predicates(&[], None, None, None, None, None, false, true, Some(3)).unwrap();
        assert_eq!(predicates, vec![PolicyPredicate::Dependencies { depth: 3 }]);
    }

    #[test]
    fn invalid_policy_flag_surfaces_parse_error() {
        let err = build_policy_predicates(&["not-a-predicate".to_string()], None, None, None, None, None, false, false, None)
            .unwrap_err();
        assert!(!err.reason.is_empty());
    }

    #[test]
    fn provenance_prefers_auditor_over_mapping() {
        let doc = sample_document(Some("Acme Audit LLP"));
        let provenance = derive_provenance(&doc, true);
        assert_eq!(provenance.source, ProvenanceSource::Auditor);
        assert_eq!(provenance.source_identity.as_deref(), Some("Acme Audit LLP"));
    }

    #[test]
    fn provenance_falls_back_to_tool_then_self() {
        let doc = sample_document(None);
        assert_eq!(derive_provenance(&doc, true).source, ProvenanceSource::Tool);
        assert_eq!(derive_provenance(&doc, false).source, ProvenanceSource::SelfSource);
    }

    #[test]
    fn assessment_depth_prefers_report_type() {
        let mut doc = sample_document(None);
        doc.metadata.report_type = Some("SOC 2 Type II".to_string());
        assert_eq!(assessment_depth_label(&doc, true), "SOC 2 Type II");
        doc.metadata.report_type = None;
        assert_eq!(assessment_depth_label(&doc, true), "mapped-extraction");
        assert_eq!(assessment_depth_label(&doc, false), "direct-ingestion");
    }

    #[test]
    fn observation_period_spans_from_evidence_date_to_today() {
        let doc = sample_document(None);
        let period = observation_period_for(&doc, NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());
        assert_eq!(period.start_date, NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
        assert_eq!(period.end_date, NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());
    }

    #[test]
    fn random_salts_are_distinct() {
        let salts = random_salts(4);
        assert_eq!(salts.len(), 4);
        assert_ne!(salts[0], salts[1]);
    }

    #[test]
    fn parse_policy_file_rejects_malformed_predicate() {
        let content = r#"["min-score=notanumber"]"#;
        assert!(parse_policy_file(content).is_err());
    }

    #[test]
    fn parse_policy_file_accepts_valid_predicates() {
        let content = r#"["require-issuer=did:web:issuer.example", "require-scitt"]"#;
        let predicates = parse_policy_file(content).unwrap();
        assert_eq!(predicates.len(), 2);
    }
}
