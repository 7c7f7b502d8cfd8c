// Criterion benchmarks for morcas-morph.
//
// Uses the sample cascades under test-data/. Set MORCAS_RULES_DIR to a
// directory holding v.cas and n.cas (and their stages) to benchmark other
// rules.
//
// Run:
//   cargo bench -p morcas-morph
//   MORCAS_RULES_DIR=/path/to/rules cargo bench -p morcas-morph

use std::path::PathBuf;

use criterion::{Criterion, criterion_group, criterion_main};
use morcas_core::FeatureStructure;
use morcas_fst::{Cascade, DirSource, SearchOptions};
use morcas_morph::MorphHandle;

// ---------------------------------------------------------------------------
// Rule discovery
// ---------------------------------------------------------------------------

fn test_data() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../test-data")
}

fn rules_dir() -> PathBuf {
    std::env::var("MORCAS_RULES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| test_data().join("morph"))
}

fn load_handle() -> MorphHandle {
    MorphHandle::load_dir(rules_dir(), &["v", "n"]).expect("rules compile")
}

/// Every CaCaC / CaCeC word over the sample consonants, with and without
/// the -u suffix, plus some words no cascade accepts.
fn wordlist() -> Vec<String> {
    let consonants = ["b", "c", "d", "g", "s", "r", "t"];
    let mut words = Vec::new();
    for c1 in consonants {
        for c2 in consonants {
            for c3 in consonants {
                for stem in [format!("{c1}a{c2}a{c3}"), format!("{c1}a{c2}e{c3}")] {
                    words.push(format!("{stem}u"));
                    words.push(stem);
                }
            }
        }
    }
    words.extend(["xyz", "sabarx", "aaaa"].map(String::from));
    words
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Compile the sample cascades from disk.
fn bench_compile(c: &mut Criterion) {
    let dir = rules_dir();
    c.bench_function("compile_v_n", |b| {
        b.iter(|| std::hint::black_box(MorphHandle::load_dir(&dir, &["v", "n"])));
    });

    let stages = DirSource::new(test_data().join("stages"));
    c.bench_function("compile_four_stage_cascade", |b| {
        b.iter(|| std::hint::black_box(Cascade::compile(&stages, "order")));
    });
}

/// Analyze every word of the word list, one at a time.
fn bench_analyze_words(c: &mut Criterion) {
    let handle = load_handle();
    let words = wordlist();
    let name = format!("analyze_{}_words", words.len());
    c.bench_function(&name, |b| {
        b.iter(|| {
            for word in &words {
                std::hint::black_box(handle.analyze(word));
            }
        });
    });
}

/// The same word list through the batch API.
fn bench_analyze_batch(c: &mut Criterion) {
    let handle = load_handle();
    let words = wordlist();
    c.bench_function("analyze_batch", |b| {
        b.iter(|| std::hint::black_box(handle.analyze_batch(&words[..])));
    });
}

/// Raw cascade traversal on the four-stage sample.
fn bench_cascade_traverse(c: &mut Criterion) {
    let cascade = Cascade::compile(&DirSource::new(test_data().join("stages")), "order")
        .expect("sample cascade compiles");
    let options = SearchOptions::default();
    let inputs = ["bGEcIa", "baca", "bicia", "dGacIa", "bccia"];
    c.bench_function("cascade_traverse_5_inputs", |b| {
        b.iter(|| {
            for input in &inputs {
                std::hint::black_box(cascade.analyze(input, &options));
            }
        });
    });
}

/// Strict and relaxed generation.
fn bench_generate(c: &mut Criterion) {
    let handle = load_handle();
    let strict: FeatureStructure = "[pos=v,tm=imf,-pl]".parse().expect("request");
    let relaxed: FeatureStructure = "[pos=v,tm=imf,+pass,-pl]".parse().expect("request");

    c.bench_function("generate_strict", |b| {
        b.iter(|| std::hint::black_box(handle.generate("s|b|r", &strict)));
    });
    c.bench_function("generate_guess", |b| {
        b.iter(|| std::hint::black_box(handle.generate_guess("s|b|r", &relaxed)));
    });
}

criterion_group!(
    benches,
    bench_compile,
    bench_analyze_words,
    bench_analyze_batch,
    bench_cascade_traverse,
    bench_generate,
);
criterion_main!(benches);
