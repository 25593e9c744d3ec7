// Grounded on the teacher's `line_tracking_bench.rs` (synthetic content of
// varying sizes, `BenchmarkId`-grouped comparisons), retargeted from the
// teacher's regex line chunker onto the structural chunker of §4.2.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lumen_search_core::chunking::TreeSitterChunker;
use lumen_search_core::config::ChunkingConfig;

fn generate_rust_source(function_count: usize) -> String {
    let mut source = String::new();
    for i in 0..function_count {
        source.push_str(&format!(
            "fn function_{i}(x: i32, y: i32) -> i32 {{\n    let sum = x + y;\n    sum * {i}\n}}\n\n"
        ));
    }
    source
}

fn benchmark_chunk_file(c: &mut Criterion) {
    let chunker = TreeSitterChunker::new();
    let config = ChunkingConfig::default();

    let cases = vec![
        ("small", generate_rust_source(10)),
        ("medium", generate_rust_source(100)),
        ("large", generate_rust_source(1000)),
    ];

    let mut group = c.benchmark_group("chunk_file_rust");
    for (name, source) in cases {
        group.bench_with_input(BenchmarkId::new("chunk_file", name), &source, |b, source| {
            b.iter(|| {
                black_box(lumen_search_core::chunking::chunk_file(
                    "bench.rs",
                    black_box(source.as_bytes()),
                    &chunker,
                    &config,
                ))
            })
        });
    }
    group.finish();
}

fn benchmark_oversized_function_split(c: &mut Criterion) {
    let chunker = TreeSitterChunker::new();
    let config = ChunkingConfig { max_chunk_bytes: 256, ..ChunkingConfig::default() };

    let mut body = String::from("fn big_function() -> i32 {\n");
    for i in 0..500 {
        body.push_str(&format!("    let v{i} = {i};\n"));
    }
    body.push_str("    0\n}\n");

    c.bench_function("chunk_file_oversized_split", |b| {
        b.iter(|| {
            black_box(lumen_search_core::chunking::chunk_file(
                "bench.rs",
                black_box(body.as_bytes()),
                &chunker,
                &config,
            ))
        })
    });
}

criterion_group!(benches, benchmark_chunk_file, benchmark_oversized_function_split);
criterion_main!(benches);
