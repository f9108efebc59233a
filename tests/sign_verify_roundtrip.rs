// SPDX-License-Identifier: MIT OR Apache-2.0
//! Full pipeline round trip: ingest a document, run the assurance
//! calculator, generate a credential subject, seal a receipt chain with a
//! marque, sign, and verify — then confirm a tampered signature is
//! rejected.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use corsair_assurance::{CalculatorInput, calculate};
use corsair_core::{
    DocumentMetadata, FrameworkRef, IngestedControl, IngestedDocument, ObservationPeriod,
    Provenance, ProvenanceSource, Receipt, Severity, Status, Step,
};
use corsair_credential::{SignedCpoe, sign_cpoe};
use corsair_ingest::map_to_marque_input;
use corsair_keys::KeyManager;
use corsair_policy::PolicyEngine;
use corsair_receipt::{ReceiptBuilder, ReceiptChain};
use corsair_verify::{Verdict, VerifyOptions, verify_cpoe};
use std::collections::BTreeMap;

fn document() -> IngestedDocument {
    IngestedDocument {
        source: "auditor-report".to_string(),
        metadata: DocumentMetadata {
            title: "Annual SOC 2 Assessment".to_string(),
            issuer: "Acme Audit LLP".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            scope: "prod AWS account".to_string(),
            auditor: Some("Acme Audit LLP".to_string()),
            report_type: Some("SOC 2 Type II".to_string()),
            raw_text_hash: None,
        },
        controls: vec![IngestedControl {
            id: "c1".to_string(),
            description: "Access was independently tested and demonstrated quarterly.".to_string(),
            status: Status::Effective,
            severity: Severity::High,
            evidence: Some("Screenshots and system logs attached.".to_string()),
            framework_refs: vec![FrameworkRef {
                framework: "SOC2".to_string(),
                control_id: "CC6.1".to_string(),
                control_name: None,
            }],
        }],
        assessment_context: None,
    }
}

fn sign_from_scratch(key_dir: &std::path::Path) -> (SignedCpoe, KeyManager) {
    let doc = document();
    let marque_input = map_to_marque_input(&doc);

    let provenance = Provenance {
        source: ProvenanceSource::Auditor,
        source_identity: Some("Acme Audit LLP".to_string()),
        source_date: Some(NaiveDate::from_ymd_opt(2026, 6, 30).unwrap()),
        evidence_type_distribution: None,
    };
    let calc_input = CalculatorInput {
        document: &doc,
        provenance: provenance.clone(),
        observation_sufficient: true,
        today: NaiveDate::from_ymd_opt(2026, 7, 27).unwrap(),
        excluded_control_ids: BTreeSet::new(),
    };
    let calc_output = calculate(&calc_input);
    let observation_period = ObservationPeriod::from_dates(
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
    );

    let subject = corsair_credential::generate_subject(corsair_credential::GeneratorInput {
        marque_input: &marque_input,
        calculator_output: &calc_output,
        provenance,
        observation_period,
        assessment_depth: "manual-audit".to_string(),
        resolved_frameworks: BTreeMap::new(),
    });

    let mut chain = ReceiptChain::new();
    let ingest_receipt = ReceiptBuilder::new(Step::Ingest)
        .reproducible("mapping-registry@1")
        .with_digest()
        .unwrap();
    chain.push(ingest_receipt.clone()).unwrap();
    let classify_receipt = ReceiptBuilder::new(Step::Classify)
        .reproducible("assurance-calculator@1")
        .previous(&ingest_receipt)
        .with_digest()
        .unwrap();
    chain.push(classify_receipt).unwrap();

    let receipts: Vec<Receipt> = corsair_credential::seal_with_marque(&mut chain, "cpoe-generator@1").unwrap();
    let marque_id = uuid::Uuid::new_v4();

    let key_manager = KeyManager::load_or_generate(key_dir).unwrap();
    let signed = sign_cpoe(
        &key_manager,
        "issuer.example.com",
        "Acme Corp",
        &subject,
        1_800_000_000,
        90,
        marque_id,
        receipts,
    )
    .unwrap();

    (signed, key_manager)
}

#[tokio::test]
async fn sign_then_verify_accepts_with_intact_receipts() {
    let dir = tempfile::tempdir().unwrap();
    let (signed, key_manager) = sign_from_scratch(dir.path());

    let public_key = key_manager.public_key();
    let policy = PolicyEngine::new();
    let options = VerifyOptions {
        explicit_public_key: Some(&public_key),
        policy: &policy,
        today: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
        now: 1_800_000_000 + 10,
        core_domain: None,
    };

    let outcome = verify_cpoe(&signed.compact, &reqwest::Client::new(), &options)
        .await
        .unwrap();
    assert_eq!(outcome.verdict, Verdict::Accepted);
    assert_eq!(outcome.payload.vc.receipts.last().unwrap().step, Step::Marque);
}

#[tokio::test]
async fn tampering_with_the_signature_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (signed, key_manager) = sign_from_scratch(dir.path());

    let mut parts: Vec<&str> = signed.compact.split('.').collect();
    let tampered_signature = if parts[2].starts_with('A') { "B" } else { "A" };
    let owned = format!("{tampered_signature}{}", &parts[2][1..]);
    parts[2] = &owned;
    let tampered = parts.join(".");

    let public_key = key_manager.public_key();
    let policy = PolicyEngine::new();
    let options = VerifyOptions {
        explicit_public_key: Some(&public_key),
        policy: &policy,
        today: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
        now: 1_800_000_000 + 10,
        core_domain: None,
    };

    let outcome = verify_cpoe(&tampered, &reqwest::Client::new(), &options)
        .await
        .unwrap();
    assert_eq!(outcome.verdict, Verdict::BadSignature);
}
