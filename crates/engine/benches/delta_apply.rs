//! Benchmarks for diff application and chain reconstruction.
//!
//! Run with: `cargo bench -p engine --bench delta_apply`

use std::hint::black_box;
use std::io::Cursor;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use engine::{Coordinator, FulltextStore, Mark, RevisionId, StoreKind, apply_diff};
use rcs::{RevisionMetadata, Sink};

/// Builds a text of `lines` numbered lines.
fn create_text(lines: usize) -> Vec<u8> {
    (0..lines)
        .flat_map(|i| format!("line {i} of the benchmark fulltext\n").into_bytes())
        .collect()
}

/// Builds a diff touching every tenth line: delete it and insert a replacement.
fn create_diff(lines: usize) -> Vec<u8> {
    let mut diff = Vec::new();
    for line in (1..=lines).step_by(10) {
        diff.extend_from_slice(format!("d{line} 1\na{line} 1\nreplacement {line}\n").as_bytes());
    }
    diff
}

fn apply_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_diff");

    for lines in [100, 1_000, 10_000, 100_000] {
        let text = create_text(lines);
        let diff = create_diff(lines);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(lines),
            &(text, diff),
            |b, (text, diff)| {
                b.iter(|| black_box(apply_diff(text, diff).unwrap()));
            },
        );
    }

    group.finish();
}

fn metadata(revision: &str, next: Option<&str>) -> RevisionMetadata {
    RevisionMetadata {
        revision: revision.to_owned(),
        timestamp: 1_000_000_000,
        author: "bench".to_owned(),
        state: "Exp".to_owned(),
        branches: Vec::new(),
        next: next.map(str::to_owned),
    }
}

/// Reconstructs a trunk of `depth` revisions, emitting every one.
fn reconstruct_chain(depth: usize, head: &[u8], diff: &[u8]) -> u64 {
    let ids: Vec<String> = (1..=depth).rev().map(|n| format!("1.{n}")).collect();
    let mut blobs =
        FulltextStore::new(StoreKind::Blob, Cursor::new(Vec::new())).unwrap();
    let scratch = FulltextStore::new(StoreKind::Scratch, Cursor::new(Vec::new())).unwrap();
    let marks = ids
        .iter()
        .enumerate()
        .map(|(mark, id)| (RevisionId::from(id.as_str()), Mark::from(mark as u64)));
    let mut coordinator = Coordinator::new("bench.c,v", marks, &mut blobs, scratch).unwrap();

    for (index, id) in ids.iter().enumerate() {
        let next = ids.get(index + 1).map(String::as_str);
        coordinator.on_revision_metadata(metadata(id, next)).unwrap();
    }
    coordinator.on_tree_complete().unwrap();
    for (index, id) in ids.iter().enumerate() {
        let text = if index == 0 { head.to_vec() } else { diff.to_vec() };
        coordinator.on_revision_text(id, b"", text).unwrap();
    }
    coordinator.on_parse_complete().unwrap();
    coordinator.stats().bytes_emitted
}

fn chain_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct_chain");
    let head = create_text(1_000);
    let diff = create_diff(1_000);

    for depth in [10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| black_box(reconstruct_chain(depth, &head, &diff)));
        });
    }

    group.finish();
}

criterion_group!(benches, apply_benchmarks, chain_benchmarks);
criterion_main!(benches);
