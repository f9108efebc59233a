// SPDX-License-Identifier: MIT OR Apache-2.0
//! Benchmarks for the assurance calculator's per-document scoring pass.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use corsair_assurance::{CalculatorInput, calculate};
use corsair_core::{
    DocumentMetadata, IngestedControl, IngestedDocument, Provenance, ProvenanceSource, Severity,
    Status,
};

fn document(control_count: usize) -> IngestedDocument {
    let controls = (0..control_count)
        .map(|i| IngestedControl {
            id: format!("c{i}"),
            description: "Access reviews were independently tested and demonstrated quarterly.".to_string(),
            status: if i % 7 == 0 { Status::Ineffective } else { Status::Effective },
            severity: Severity::High,
            evidence: Some("Screenshots and system logs attached.".to_string()),
            framework_refs: vec![],
        })
        .collect();
    IngestedDocument {
        source: "auditor-report".to_string(),
        metadata: DocumentMetadata {
            title: "Bench Assessment".to_string(),
            issuer: "Acme Audit LLP".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            scope: "prod AWS account".to_string(),
            auditor: Some("Acme Audit LLP".to_string()),
            report_type: Some("SOC 2 Type II".to_string()),
            raw_text_hash: None,
        },
        controls,
        assessment_context: None,
    }
}

fn bench_calculate(c: &mut Criterion) {
    let mut group = c.benchmark_group("assurance_calculate");
    for size in [1, 25, 100, 500] {
        let doc = document(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("controls", size), &doc, |b, doc| {
            let input = CalculatorInput {
                document: doc,
                provenance: Provenance {
                    source: ProvenanceSource::Auditor,
                    source_identity: Some("Acme Audit LLP".to_string()),
                    source_date: NaiveDate::from_ymd_opt(2026, 6, 30),
                    evidence_type_distribution: None,
                },
                observation_sufficient: true,
                today: NaiveDate::from_ymd_opt(2026, 7, 27).unwrap(),
                excluded_control_ids: BTreeSet::new(),
            };
            b.iter(|| calculate(black_box(&input)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_calculate);
criterion_main!(benches);
