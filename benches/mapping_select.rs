// SPDX-License-Identifier: MIT OR Apache-2.0
//! Benchmarks for mapping-rule selection as the registry grows.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::json;

use corsair_mapping::{ControlsSpec, MappingRegistry, MappingRule, MatchPredicate};

fn mapping(id: &str, priority: i64, key: &str) -> MappingRule {
    MappingRule {
        id: id.to_string(),
        name: None,
        source: Some("tool".to_string()),
        priority,
        match_predicate: MatchPredicate {
            all_of: vec![key.to_string()],
            any_of: vec![],
        },
        metadata: Default::default(),
        controls: Some(ControlsSpec {
            path: "findings".to_string(),
            id_path: Some("id".to_string()),
            description_path: None,
            status_path: None,
            status_map: None,
            severity_path: None,
            severity_map: None,
            evidence_path: None,
            framework_refs: None,
        }),
        passthrough: None,
    }
}

fn registry_of(size: usize) -> MappingRegistry {
    let mut registry = MappingRegistry::new();
    for i in 0..size {
        registry.add(mapping(&format!("m{i}"), i as i64, &format!("marker_{i}"))).unwrap();
    }
    registry
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapping_select");
    for size in [1, 10, 50, 200] {
        let registry = registry_of(size);
        let input = json!({"unrelated": true});
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("rules", size), &registry, |b, registry| {
            b.iter(|| registry.select(black_box(&input)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_select);
criterion_main!(benches);
