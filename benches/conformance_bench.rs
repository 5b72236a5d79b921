// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Cost of one conformance round, broken into its phases.
//!
//! - universe: seed generation, stats replay included
//! - build: replay every term into a block segment and reopen it
//! - verify: dictionary walk plus one single-threaded trial pass
//! - suite: the whole `run_all` on the quick configuration
//!
//! Run with: cargo bench --bench conformance_bench

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use sorex_conformance::binary::encoding::{decode_varint, encode_varint};
use sorex_conformance::{
    build_index, BlockPostingsFormat, BuildOptions, ConformanceConfig, ConformanceSuite, DeterministicRng,
    IndexOptions, PostingsUniverse, TrialOptions, TrialSettings, Verifier,
};

const SEED: u64 = 0x5eed;

fn bench_universe(c: &mut Criterion) {
    let config = ConformanceConfig::quick(SEED);
    c.bench_function("universe/generate_quick", |b| {
        b.iter(|| black_box(PostingsUniverse::generate(black_box(&config), true)));
    });
}

fn bench_build(c: &mut Criterion) {
    let config = ConformanceConfig::quick(SEED);
    let universe = PostingsUniverse::generate(&config, true);
    let format = BlockPostingsFormat::new();

    let mut group = c.benchmark_group("build");
    group.throughput(Throughput::Elements(universe.total_postings()));
    for level in IndexOptions::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, &level| {
            b.iter_batched(
                || tempfile::tempdir().unwrap(),
                |dir| {
                    let mut rng = DeterministicRng::new(SEED);
                    let built = build_index(&format, &universe, dir.path(), BuildOptions::full(level, true), &mut rng)
                        .unwrap();
                    black_box(built.report);
                    dir
                },
                BatchSize::PerIteration,
            );
        });
    }
    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let config = ConformanceConfig::quick(SEED);
    let universe = PostingsUniverse::generate(&config, true);
    let dir = tempfile::tempdir().unwrap();
    let level = IndexOptions::DocsAndFreqsAndPositionsAndOffsets;
    let mut rng = DeterministicRng::new(SEED);
    let built = build_index(
        &BlockPostingsFormat::new(),
        &universe,
        dir.path(),
        BuildOptions::full(level, true),
        &mut rng,
    )
    .unwrap();
    let verifier = Verifier::from_built(&universe, built).unwrap();
    let settings = TrialSettings::exhaustive(TrialOptions::ALL.without(TrialOptions::THREADS), level);

    let mut group = c.benchmark_group("verify");
    group.throughput(Throughput::Elements(universe.all_terms().len() as u64));
    group.bench_function("term_dictionary", |b| {
        b.iter(|| black_box(verifier.verify_term_dictionary(SEED).unwrap()));
    });
    group.bench_function("single_thread_pass", |b| {
        b.iter(|| black_box(verifier.test_terms_one_thread(settings, SEED).unwrap()));
    });
    group.finish();
}

fn bench_suite(c: &mut Criterion) {
    let mut group = c.benchmark_group("suite");
    group.sample_size(10);
    group.bench_function("run_all_quick", |b| {
        b.iter_batched(
            || ConformanceSuite::new(BlockPostingsFormat::new(), ConformanceConfig::quick(SEED)).unwrap(),
            |suite| black_box(suite.run_all().unwrap()),
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn bench_varint(c: &mut Criterion) {
    let values: Vec<u64> = (0..1024u64).map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> (i % 64)).collect();
    let mut encoded = Vec::new();
    for &v in &values {
        encode_varint(v, &mut encoded);
    }

    let mut group = c.benchmark_group("varint");
    group.throughput(Throughput::Elements(values.len() as u64));
    group.bench_function("encode", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(encoded.len());
            for &v in &values {
                encode_varint(black_box(v), &mut buf);
            }
            buf
        });
    });
    group.bench_function("decode", |b| {
        b.iter(|| {
            let mut pos = 0;
            let mut sum = 0u64;
            while pos < encoded.len() {
                let (v, n) = decode_varint(&encoded[pos..]).unwrap();
                sum = sum.wrapping_add(v);
                pos += n;
            }
            sum
        });
    });
    group.finish();
}

criterion_group!(benches, bench_universe, bench_build, bench_verify, bench_suite, bench_varint);
criterion_main!(benches);
