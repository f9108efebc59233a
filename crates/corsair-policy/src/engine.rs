// SPDX-License-Identifier: MIT OR Apache-2.0
//! The policy engine: evaluates a set of [`PolicyPredicate`]s against a
//! decoded CPOE.

use chrono::NaiveDate;
use corsair_core::{ProvenanceSource, Receipt, Step};

use crate::predicate::PolicyPredicate;

/// Everything a [`PolicyEngine`] needs to evaluate its predicates, gathered
/// by the verifier from the decoded payload, credential subject, and
/// receipt chain. Kept independent of the JWT/credential wire types so
/// this crate has no dependency on `corsair-credential`.
#[derive(Debug, Clone)]
pub struct PolicyInput<'a> {
    /// `iss` claim.
    pub issuer: &'a str,
    /// Framework names present in `credentialSubject.frameworks`.
    pub frameworks: &'a [String],
    /// `provenance.sourceDate`, if known.
    pub source_date: Option<NaiveDate>,
    /// `summary.overallScore`.
    pub overall_score: u32,
    /// `provenance.source`.
    pub source: ProvenanceSource,
    /// `provenance.sourceIdentity`, if known.
    pub source_identity: Option<&'a str>,
    /// The full sealed receipt chain embedded in the payload.
    pub receipts: &'a [Receipt],
    /// Evaluation date, for `max-age` arithmetic.
    pub today: NaiveDate,
}

/// Outcome of evaluating a single predicate or the whole engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether every checked predicate passed.
    pub allowed: bool,
    /// The first failing predicate's name, if denied.
    pub failed_policy: Option<String>,
    /// Human-readable explanation.
    pub reason: Option<String>,
}

impl Decision {
    /// Build an accepting decision.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allowed: true,
            failed_policy: None,
            reason: None,
        }
    }

    /// Build a denying decision naming the predicate that failed.
    #[must_use]
    pub fn deny(predicate: &PolicyPredicate, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            failed_policy: Some(predicate.name().to_string()),
            reason: Some(reason.into()),
        }
    }
}

/// Evaluates a fixed set of [`PolicyPredicate`]s against a [`PolicyInput`].
/// All predicates must pass; the first failure short-circuits evaluation,
/// matching the state machine's `Rejected(policyName)` transition.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    predicates: Vec<PolicyPredicate>,
}

impl PolicyEngine {
    /// Build an engine with no predicates set; `evaluate` always accepts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine from an explicit predicate list.
    #[must_use]
    pub fn with_predicates(predicates: Vec<PolicyPredicate>) -> Self {
        Self { predicates }
    }

    /// Predicates currently configured on this engine.
    #[must_use]
    pub fn predicates(&self) -> &[PolicyPredicate] {
        &self.predicates
    }

    /// Evaluate every configured predicate against `input`, short-circuiting
    /// on the first failure.
    #[must_use]
    pub fn evaluate(&self, input: &PolicyInput<'_>) -> Decision {
        for predicate in &self.predicates {
            if let Some(decision) = check_one(predicate, input) {
                return decision;
            }
        }
        Decision::allow()
    }
}

fn check_one(predicate: &PolicyPredicate, input: &PolicyInput<'_>) -> Option<Decision> {
    match predicate {
        PolicyPredicate::RequireIssuer(did) => {
            (input.issuer != did).then(|| Decision::deny(predicate, format!("issuer '{}' != required '{did}'", input.issuer)))
        }
        PolicyPredicate::RequireFramework(required) => {
            let missing: Vec<&String> = required.iter().filter(|f| !input.frameworks.contains(f)).collect();
            (!missing.is_empty()).then(|| {
                Decision::deny(
                    predicate,
                    format!("missing framework coverage: {}", missing.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")),
                )
            })
        }
        PolicyPredicate::MaxAgeDays(max_days) => match input.source_date {
            None => Some(Decision::deny(predicate, "provenance has no sourceDate to check")),
            Some(date) => {
                let age = (input.today - date).num_days();
                (age > i64::from(*max_days)).then(|| Decision::deny(predicate, format!("evidence is {age} days old, exceeds {max_days}")))
            }
        },
        PolicyPredicate::MinScore(min) => {
            (input.overall_score < *min).then(|| Decision::deny(predicate, format!("overall score {} below required {min}", input.overall_score)))
        }
        PolicyPredicate::RequireSource(expected) => {
            (input.source != *expected).then(|| Decision::deny(predicate, "provenance source does not match"))
        }
        PolicyPredicate::RequireSourceIdentity(allowed) => match input.source_identity {
            None => Some(Decision::deny(predicate, "provenance has no sourceIdentity")),
            Some(identity) => (!allowed.iter().any(|a| a == identity))
                .then(|| Decision::deny(predicate, format!("source identity '{identity}' not in allowlist"))),
        },
        PolicyPredicate::RequireToolAttestation => {
            let has_attestation = input.receipts.iter().any(|r| r.llm_attestation.is_some() || r.code_version.is_some());
            (!has_attestation).then(|| Decision::deny(predicate, "no receipt carries an llmAttestation or codeVersion"))
        }
        PolicyPredicate::RequireInputBinding => {
            let bound = input
                .receipts
                .iter()
                .find(|r| r.step == Step::Ingest)
                .is_some_and(|r| !r.input_digest.is_empty());
            (!bound).then(|| Decision::deny(predicate, "ingest receipt does not bind a content digest"))
        }
        PolicyPredicate::RequireEvidenceChain => check_evidence_chain(predicate, input),
        PolicyPredicate::RequireReceipts => {
            let steps_present: std::collections::BTreeSet<Step> = input.receipts.iter().map(|r| r.step).collect();
            let required = [Step::Ingest, Step::Classify, Step::Chart, Step::Marque];
            let missing: Vec<&str> = required
                .iter()
                .filter(|s| !steps_present.contains(s))
                .map(step_name)
                .collect();
            (!missing.is_empty()).then(|| Decision::deny(predicate, format!("missing receipts for step(s): {}", missing.join(", "))))
        }
        PolicyPredicate::RequireScitt => {
            let all_have_entries = input.receipts.iter().all(|r| r.transparency_entry_id.is_some());
            (!all_have_entries).then(|| Decision::deny(predicate, "not every receipt carries a transparency-log entry id"))
        }
        PolicyPredicate::Dependencies { .. } => None,
    }
}

fn step_name(step: &Step) -> &'static str {
    match step {
        Step::Ingest => "ingest",
        Step::Classify => "classify",
        Step::Chart => "chart",
        Step::Marque => "marque",
    }
}

fn check_evidence_chain(predicate: &PolicyPredicate, input: &PolicyInput<'_>) -> Option<Decision> {
    let Some((marque, prior)) = input.receipts.split_last() else {
        return Some(Decision::deny(predicate, "no receipts to verify"));
    };
    if marque.step != Step::Marque {
        return Some(Decision::deny(predicate, "final receipt is not the marque step"));
    }
    let recomputed = match corsair_receipt::chain_digest(prior) {
        Ok(d) => d,
        Err(_) => return Some(Decision::deny(predicate, "failed to re-hash the receipt chain")),
    };
    (marque.input_digest != recomputed).then(|| Decision::deny(predicate, "re-hashed chain digest does not match the embedded digest"))
}
