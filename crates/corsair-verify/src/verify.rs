// SPDX-License-Identifier: MIT OR Apache-2.0
//! The Verifier's top-level pipeline and acceptance state machine.

use chrono::NaiveDate;
use ed25519_dalek::{Verifier as _, VerifyingKey};

use corsair_core::CredentialSubject;
use corsair_credential::{
    Header, Payload, decode_jwt_header, decode_jwt_payload, decode_jwt_signature, envelope_to_compact, signing_input,
};
use corsair_error::{CorsairError, ErrorCode};
use corsair_policy::{PolicyEngine, PolicyInput};

use crate::resolve;

/// Where a CPOE's issuer DID sits relative to the verifier's own
/// operating domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuerTier {
    /// `did:web:<core-domain>` — the platform's own issuer.
    CoreVerified,
    /// Any other `did:web:*` issuer.
    SelfSigned,
    /// Not a `did:web` DID at all.
    Unverifiable,
}

/// The terminal state the state machine landed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Ed25519 verification failed against the resolved key. Terminal.
    BadSignature,
    /// Signature valid, but `exp` has passed. The payload is still
    /// available for inspection.
    Expired,
    /// Signature valid and fresh, but a named policy predicate failed.
    Rejected {
        /// The first predicate that failed.
        policy: String,
        /// Human-readable reason.
        reason: Option<String>,
    },
    /// Signature valid, fresh, and every configured policy passed.
    Accepted,
}

/// Everything a single `verify_cpoe` call returns: the terminal verdict,
/// the decoded payload (always present once the JWT parses, regardless of
/// verdict), and the derived issuer tier.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    /// Where the state machine terminated.
    pub verdict: Verdict,
    /// The decoded JWT payload.
    pub payload: Payload,
    /// The issuer's tier, derived from `iss` alone.
    pub issuer_tier: IssuerTier,
}

impl VerificationOutcome {
    /// `true` iff the verdict is [`Verdict::Accepted`].
    #[must_use]
    pub fn accepted(&self) -> bool {
        matches!(self.verdict, Verdict::Accepted)
    }
}

/// Inputs to a single verification run.
pub struct VerifyOptions<'a> {
    /// If set, bypasses DID resolution and verifies against this key
    /// directly (the "explicit PEM" step of key resolution).
    pub explicit_public_key: Option<&'a VerifyingKey>,
    /// Policy predicates that must all pass for `Accepted`.
    pub policy: &'a PolicyEngine,
    /// Evaluation date, for `max-age` policy arithmetic.
    pub today: NaiveDate,
    /// Seconds since epoch, for the `exp` temporal check.
    pub now: i64,
    /// The platform's own issuer domain, if any, for issuer-tier
    /// derivation. `None` means no issuer can be `CoreVerified`.
    pub core_domain: Option<&'a str>,
}

/// Derive the [`IssuerTier`] from an `iss` DID alone.
#[must_use]
pub fn derive_issuer_tier(issuer: &str, core_domain: Option<&str>) -> IssuerTier {
    match issuer.strip_prefix("did:web:") {
        Some(domain) if core_domain.is_some_and(|core| domain == core) => IssuerTier::CoreVerified,
        Some(_) => IssuerTier::SelfSigned,
        None => IssuerTier::Unverifiable,
    }
}

fn did_from_kid(kid: &str) -> &str {
    kid.split('#').next().unwrap_or(kid)
}

async fn resolve_public_key(
    client: &reqwest::Client,
    header: &Header,
    payload: &Payload,
    explicit: Option<&VerifyingKey>,
) -> Result<VerifyingKey, CorsairError> {
    if let Some(key) = explicit {
        return Ok(*key);
    }
    let did = if header.kid.is_empty() {
        payload.iss.as_str()
    } else {
        did_from_kid(&header.kid)
    };
    let document = resolve::resolve_did_web(client, did).await?;
    let method = document
        .verification_method
        .iter()
        .find(|m| m.id == header.kid)
        .or_else(|| document.verification_method.first())
        .ok_or_else(|| {
            CorsairError::new(
                ErrorCode::DidDocumentUnreachable,
                format!("DID document for {did} has no verification methods"),
            )
        })?;
    resolve::decode_multibase_key(&method.public_key_multibase)
}

fn policy_input_from(payload: &Payload, subject: &CredentialSubject, today: NaiveDate) -> PolicyInput<'_> {
    PolicyInput {
        issuer: &payload.iss,
        frameworks: &[],
        source_date: subject.provenance.source_date,
        overall_score: subject.summary.overall_score,
        source: subject.provenance.source,
        source_identity: subject.provenance.source_identity.as_deref(),
        receipts: &payload.vc.receipts,
        today,
    }
}

/// Run the full verification pipeline against a presented CPOE: format
/// detection, header/payload decode, key resolution, signature
/// verification, temporal check, and policy evaluation.
///
/// `presented` may be either the JWT-VC compact serialization (three
/// dot-separated base64url segments) or the legacy "v1" JSON envelope
/// carrying the same three segments as named JSON properties — the
/// verifier always accepts both, even though this implementation only
/// ever issues the JWT-VC form.
///
/// # Errors
///
/// Returns [`CorsairError`] for structural failures that happen before the
/// `Parsed` state is reached (malformed JWT or envelope, unsupported
/// `alg`, a `credentialSubject` that doesn't deserialize) or for a key
/// resolution failure (DID not `did:web`, SSRF-blocked host, unreachable
/// document). Signature mismatch, expiry, and policy rejection are *not*
/// errors — they're returned as a [`Verdict`] inside
/// [`VerificationOutcome`], since the decoded payload remains available
/// for inspection either way.
pub async fn verify_cpoe(
    presented: &str,
    client: &reqwest::Client,
    options: &VerifyOptions<'_>,
) -> Result<VerificationOutcome, CorsairError> {
    let owned;
    let compact: &str = if presented.split('.').count() == 3 {
        presented
    } else {
        owned = envelope_to_compact(presented)?;
        &owned
    };

    let header = decode_jwt_header(compact)?;
    if header.alg != "EdDSA" {
        return Err(CorsairError::new(
            ErrorCode::UnsupportedAlgorithm,
            format!("unsupported alg '{}': only EdDSA is accepted", header.alg),
        ));
    }
    let payload = decode_jwt_payload(compact)?;
    let issuer_tier = derive_issuer_tier(&payload.iss, options.core_domain);

    let public_key = resolve_public_key(client, &header, &payload, options.explicit_public_key).await?;

    let input = signing_input(compact)?;
    let signature = decode_jwt_signature(compact)?;
    if public_key.verify(input.as_bytes(), &signature).is_err() {
        return Ok(VerificationOutcome {
            verdict: Verdict::BadSignature,
            payload,
            issuer_tier,
        });
    }

    if payload.is_expired(options.now) {
        return Ok(VerificationOutcome {
            verdict: Verdict::Expired,
            payload,
            issuer_tier,
        });
    }

    let subject: CredentialSubject = serde_json::from_value(payload.vc.credential_subject.clone())
        .map_err(|e| CorsairError::new(ErrorCode::InputMissingField, format!("malformed credentialSubject: {e}")))?;
    let frameworks: Vec<String> = subject.frameworks.keys().cloned().collect();
    let mut input = policy_input_from(&payload, &subject, options.today);
    input.frameworks = &frameworks;

    let decision = options.policy.evaluate(&input);
    let verdict = if decision.allowed {
        Verdict::Accepted
    } else {
        Verdict::Rejected {
            policy: decision.failed_policy.unwrap_or_default(),
            reason: decision.reason,
        }
    };

    Ok(VerificationOutcome {
        verdict,
        payload,
        issuer_tier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use corsair_core::{
        AssuranceClaim, AssuranceLevel, Dimensions, DoraBand, DoraMetrics, FairMapping, Method,
        ObservationPeriod, PertEstimate, Provenance, ProvenanceSource, RiskQuantification, Summary,
    };
    use corsair_keys::KeyManager;
    use corsair_policy::PolicyPredicate;
    use std::collections::BTreeMap;

    fn sample_subject() -> CredentialSubject {
        CredentialSubject {
            subject_type: "ControlAssessment".to_string(),
            scope: "prod AWS account".to_string(),
            assurance: AssuranceClaim {
                declared: AssuranceLevel::L3,
                method: Method::AuditorAttested,
                verified: true,
                breakdown: BTreeMap::new(),
                rule_trace: vec![],
                calculation_version: corsair_core::CALCULATION_VERSION.to_string(),
            },
            provenance: Provenance {
                source: ProvenanceSource::Auditor,
                source_identity: Some("Acme Audit LLP".to_string()),
                source_date: NaiveDate::from_ymd_opt(2026, 6, 30),
                evidence_type_distribution: None,
            },
            summary: Summary {
                controls_tested: 12,
                controls_passed: 12,
                controls_failed: 0,
                overall_score: 100,
            },
            dimensions: Dimensions {
                capability: 75.0,
                coverage: 100.0,
                reliability: 90.0,
                methodology: 90.0,
                freshness: 100.0,
                independence: 90.0,
                consistency: 60.0,
            },
            evidence_types: vec!["audit-report".to_string()],
            observation_period: ObservationPeriod::from_dates(
                NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            ),
            control_classifications: Vec::new(),
            assessment_depth: "manual-audit".to_string(),
            provenance_quality: 90.0,
            dora_metrics: DoraMetrics {
                freshness: 100.0,
                specificity: 90.0,
                independence: 90.0,
                reproducibility: 100.0,
                band: DoraBand::High,
                pairing_flags: Vec::new(),
            },
            risk_quantification: RiskQuantification {
                beta_pert: PertEstimate { min: 0.0, most_likely: 0.0, max: 0.0 },
                fair: FairMapping {
                    loss_event_frequency: PertEstimate { min: 0.0, most_likely: 0.0, max: 0.0 },
                    loss_magnitude_usd: PertEstimate { min: 50_000.0, most_likely: 250_000.0, max: 1_000_000.0 },
                },
            },
            frameworks: BTreeMap::from([(
                "SOC2".to_string(),
                corsair_core::FrameworkCoverage {
                    controls_mapped: 12,
                    passed: 12,
                    failed: 0,
                    controls: vec!["CC6.1".to_string()],
                    failed_controls: vec![],
                },
            )]),
        }
    }

    fn sign_sample(dir: &std::path::Path) -> (String, KeyManager) {
        let mgr = KeyManager::load_or_generate(dir).unwrap();
        let subject = sample_subject();
        let signed = corsair_credential::sign_cpoe(
            &mgr,
            "issuer.example.com",
            "Acme Corp",
            &subject,
            1_800_000_000,
            90,
            uuid::Uuid::nil(),
            Vec::new(),
        )
        .unwrap();
        (signed.compact, mgr)
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().build().unwrap()
    }

    #[tokio::test]
    async fn accepts_with_explicit_key_and_no_policy() {
        let dir = tempfile::tempdir().unwrap();
        let (compact, mgr) = sign_sample(dir.path());
        let public_key = mgr.public_key();
        let policy = PolicyEngine::new();
        let options = VerifyOptions {
            explicit_public_key: Some(&public_key),
            policy: &policy,
            today: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            now: 1_800_000_000 + 10,
            core_domain: None,
        };
        let outcome = verify_cpoe(&compact, &client(), &options).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::Accepted);
        assert_eq!(outcome.issuer_tier, IssuerTier::SelfSigned);
    }

    #[tokio::test]
    async fn bad_signature_when_key_does_not_match() {
        let dir = tempfile::tempdir().unwrap();
        let (compact, _mgr) = sign_sample(dir.path());
        let other_dir = tempfile::tempdir().unwrap();
        let other = KeyManager::load_or_generate(other_dir.path()).unwrap();
        let wrong_key = other.public_key();
        let policy = PolicyEngine::new();
        let options = VerifyOptions {
            explicit_public_key: Some(&wrong_key),
            policy: &policy,
            today: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            now: 1_800_000_000 + 10,
            core_domain: None,
        };
        let outcome = verify_cpoe(&compact, &client(), &options).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::BadSignature);
    }

    #[tokio::test]
    async fn expired_surfaces_payload_with_expired_verdict() {
        let dir = tempfile::tempdir().unwrap();
        let (compact, mgr) = sign_sample(dir.path());
        let public_key = mgr.public_key();
        let policy = PolicyEngine::new();
        let far_future = 1_800_000_000 + 91 * 86_400;
        let options = VerifyOptions {
            explicit_public_key: Some(&public_key),
            policy: &policy,
            today: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            now: far_future,
            core_domain: None,
        };
        let outcome = verify_cpoe(&compact, &client(), &options).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::Expired);
        assert_eq!(outcome.payload.jti, "marque-00000000-0000-0000-0000-000000000000");
    }

    #[tokio::test]
    async fn policy_rejection_names_the_failing_predicate() {
        let dir = tempfile::tempdir().unwrap();
        let (compact, mgr) = sign_sample(dir.path());
        let public_key = mgr.public_key();
        let policy = PolicyEngine::with_predicates(vec![PolicyPredicate::MinScore(101)]);
        let options = VerifyOptions {
            explicit_public_key: Some(&public_key),
            policy: &policy,
            today: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            now: 1_800_000_000 + 10,
            core_domain: None,
        };
        let outcome = verify_cpoe(&compact, &client(), &options).await.unwrap();
        match outcome.verdict {
            Verdict::Rejected { policy, .. } => assert_eq!(policy, "min-score"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn accepts_the_json_envelope_form_of_the_same_credential() {
        let dir = tempfile::tempdir().unwrap();
        let (compact, mgr) = sign_sample(dir.path());
        let envelope = corsair_credential::compact_to_envelope(&compact).unwrap();
        let presented = serde_json::to_string(&envelope).unwrap();
        let public_key = mgr.public_key();
        let policy = PolicyEngine::new();
        let options = VerifyOptions {
            explicit_public_key: Some(&public_key),
            policy: &policy,
            today: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            now: 1_800_000_000 + 10,
            core_domain: None,
        };
        let outcome = verify_cpoe(&presented, &client(), &options).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::Accepted);
    }

    #[tokio::test]
    async fn malformed_envelope_is_rejected_as_an_error() {
        let policy = PolicyEngine::new();
        let options = VerifyOptions {
            explicit_public_key: None,
            policy: &policy,
            today: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            now: 1_800_000_000,
            core_domain: None,
        };
        let err = verify_cpoe("not a jwt and not json either", &client(), &options).await;
        assert!(err.is_err());
    }

    #[test]
    fn issuer_tier_derivation() {
        assert_eq!(
            derive_issuer_tier("did:web:corsair.example", Some("corsair.example")),
            IssuerTier::CoreVerified
        );
        assert_eq!(
            derive_issuer_tier("did:web:someone-else.example", Some("corsair.example")),
            IssuerTier::SelfSigned
        );
        assert_eq!(derive_issuer_tier("did:key:z6Mk...", Some("corsair.example")), IssuerTier::Unverifiable);
    }
}
