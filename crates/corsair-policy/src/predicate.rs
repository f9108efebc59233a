// SPDX-License-Identifier: MIT OR Apache-2.0
//! The named, parseable policy predicates a verifier can require.

use corsair_core::ProvenanceSource;

/// One acceptance predicate. All predicates set on a [`crate::PolicyEngine`]
/// must pass for a CPOE to be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyPredicate {
    /// `require-issuer=DID` — exact match against `iss`.
    RequireIssuer(String),
    /// `require-framework=CSV` — every listed framework must be covered.
    RequireFramework(Vec<String>),
    /// `max-age=DAYS` — `provenance.sourceDate` no older than N days.
    MaxAgeDays(u32),
    /// `min-score=N` — `summary.overallScore >= N`.
    MinScore(u32),
    /// `require-source=TYPE` — `provenance.source` equals.
    RequireSource(ProvenanceSource),
    /// `require-source-identity=CSV` — identity is one of.
    RequireSourceIdentity(Vec<String>),
    /// `require-tool-attestation` — any receipt carries `llmAttestation` or `codeVersion`.
    RequireToolAttestation,
    /// `require-input-binding` — the ingest receipt binds a non-empty content digest.
    RequireInputBinding,
    /// `require-evidence-chain` — the receipt chain, re-hashed, matches the embedded chain digest.
    RequireEvidenceChain,
    /// `require-receipts` — at least one receipt per required pipeline step.
    RequireReceipts,
    /// `require-scitt` — each receipt carries a transparency-log entry id.
    RequireScitt,
    /// `dependencies` with `dependency-depth=N` — dependency CPOEs verify recursively to depth N.
    Dependencies {
        /// Maximum recursion depth.
        depth: u32,
    },
}

/// A policy predicate string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid policy predicate '{raw}': {reason}")]
pub struct PredicateParseError {
    /// The raw string that failed to parse.
    pub raw: String,
    /// Why it failed.
    pub reason: String,
}

fn err(raw: &str, reason: impl Into<String>) -> PredicateParseError {
    PredicateParseError {
        raw: raw.to_string(),
        reason: reason.into(),
    }
}

fn csv(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

impl PolicyPredicate {
    /// Parse a single `name=value` (or bare `name`) predicate string as
    /// accepted by the CLI's `--policy` flag.
    ///
    /// # Errors
    ///
    /// Returns [`PredicateParseError`] if `raw` names an unknown predicate
    /// or is missing a required value.
    pub fn parse(raw: &str) -> Result<Self, PredicateParseError> {
        let (name, value) = match raw.split_once('=') {
            Some((n, v)) => (n, Some(v)),
            None => (raw, None),
        };
        match name {
            "require-issuer" => Ok(Self::RequireIssuer(
                value.ok_or_else(|| err(raw, "missing DID"))?.to_string(),
            )),
            "require-framework" => Ok(Self::RequireFramework(csv(value.ok_or_else(|| err(raw, "missing CSV"))?))),
            "max-age" => {
                let days: u32 = value
                    .ok_or_else(|| err(raw, "missing DAYS"))?
                    .parse()
                    .map_err(|_| err(raw, "DAYS must be a non-negative integer"))?;
                Ok(Self::MaxAgeDays(days))
            }
            "min-score" => {
                let n: u32 = value
                    .ok_or_else(|| err(raw, "missing N"))?
                    .parse()
                    .map_err(|_| err(raw, "N must be a non-negative integer"))?;
                Ok(Self::MinScore(n))
            }
            "require-source" => {
                let source = match value.ok_or_else(|| err(raw, "missing TYPE"))? {
                    "self" => ProvenanceSource::SelfSource,
                    "tool" => ProvenanceSource::Tool,
                    "auditor" => ProvenanceSource::Auditor,
                    other => return Err(err(raw, format!("unknown source type '{other}'"))),
                };
                Ok(Self::RequireSource(source))
            }
            "require-source-identity" => Ok(Self::RequireSourceIdentity(csv(
                value.ok_or_else(|| err(raw, "missing CSV"))?,
            ))),
            "require-tool-attestation" => Ok(Self::RequireToolAttestation),
            "require-input-binding" => Ok(Self::RequireInputBinding),
            "require-evidence-chain" => Ok(Self::RequireEvidenceChain),
            "require-receipts" => Ok(Self::RequireReceipts),
            "require-scitt" => Ok(Self::RequireScitt),
            "dependency-depth" => {
                let depth: u32 = value
                    .ok_or_else(|| err(raw, "missing N"))?
                    .parse()
                    .map_err(|_| err(raw, "N must be a non-negative integer"))?;
                Ok(Self::Dependencies { depth })
            }
            "dependencies" => Ok(Self::Dependencies { depth: 1 }),
            other => Err(err(raw, format!("unrecognised predicate '{other}'"))),
        }
    }

    /// The stable name used in `Rejected(policyName)` and `--policy` CLI syntax.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequireIssuer(_) => "require-issuer",
            Self::RequireFramework(_) => "require-framework",
            Self::MaxAgeDays(_) => "max-age",
            Self::MinScore(_) => "min-score",
            Self::RequireSource(_) => "require-source",
            Self::RequireSourceIdentity(_) => "require-source-identity",
            Self::RequireToolAttestation => "require-tool-attestation",
            Self::RequireInputBinding => "require-input-binding",
            Self::RequireEvidenceChain => "require-evidence-chain",
            Self::RequireReceipts => "require-receipts",
            Self::RequireScitt => "require-scitt",
            Self::Dependencies { .. } => "dependencies",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_require_issuer() {
        assert_eq!(
            PolicyPredicate::parse("require-issuer=did:web:corsair.example").unwrap(),
            PolicyPredicate::RequireIssuer("did:web:corsair.example".to_string())
        );
    }

    #[test]
    fn parses_csv_predicates() {
        assert_eq!(
            PolicyPredicate::parse("require-framework=SOC2,ISO27001").unwrap(),
            PolicyPredicate::RequireFramework(vec!["SOC2".to_string(), "ISO27001".to_string()])
        );
    }

    #[test]
    fn parses_bare_predicates() {
        assert_eq!(PolicyPredicate::parse("require-scitt").unwrap(), PolicyPredicate::RequireScitt);
        assert_eq!(
            PolicyPredicate::parse("require-evidence-chain").unwrap(),
            PolicyPredicate::RequireEvidenceChain
        );
    }

    #[test]
    fn unknown_predicate_rejected() {
        assert!(PolicyPredicate::parse("require-unicorn").is_err());
    }

    #[test]
    fn missing_value_rejected() {
        assert!(PolicyPredicate::parse("min-score").is_err());
        assert!(PolicyPredicate::parse("min-score=not-a-number").is_err());
    }
}
