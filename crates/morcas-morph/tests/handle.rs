//! MorphHandle tests over the sample verb and noun cascades in
//! `test-data/morph`.
//!
//! Run: cargo test -p morcas-morph --test handle

use std::path::PathBuf;

use morcas_core::FeatureStructure;
use morcas_fst::{MemorySource, SearchOptions};
use morcas_morph::{JsonFrequencies, MorphError, MorphHandle, Relaxation};

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../test-data/morph")
}

fn handle() -> MorphHandle {
    MorphHandle::load_dir(data_dir(), &["v", "n"]).expect("sample cascades compile")
}

fn fs(s: &str) -> FeatureStructure {
    s.parse().unwrap()
}

fn surfaces(forms: &[morcas_core::GeneratedForm]) -> Vec<&str> {
    forms.iter().map(|f| f.surface.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[test]
fn ambiguous_word_has_analyses_from_both_cascades() {
    let h = handle();
    let results = h.analyze("sabar");
    assert_eq!(results.len(), 3);

    let verbs: Vec<_> = results.iter().filter(|a| a.pos() == Some("v")).collect();
    assert_eq!(verbs.len(), 2);
    assert!(verbs.iter().all(|a| a.root() == "s|b|r"));
    assert!(verbs.iter().all(|a| a.features().get("tm").and_then(|v| v.as_atom()) == Some("prf")));

    let nouns: Vec<_> = results.iter().filter(|a| a.pos() == Some("n")).collect();
    assert_eq!(nouns.len(), 1);
    assert_eq!(nouns[0].root(), "sabar");
    // More specific analyses rank first.
    assert_eq!(results[2].pos(), Some("n"));
}

#[test]
fn unknown_word_has_no_analyses() {
    let h = handle();
    assert!(h.analyze("xyz").is_empty());
    assert!(h.analyze("sab").is_empty());
    assert!(h.analyze("").is_empty());
}

#[test]
fn nbest_truncates_in_rank_order() {
    let h = handle();
    let all = h.analyze("sabar");
    for k in 0..5 {
        let top = h.analyze_nbest("sabar", k);
        assert_eq!(top.len(), k.min(all.len()));
        assert_eq!(top.as_slice(), &all[..top.len()]);
    }
}

#[test]
fn repeated_analysis_is_identical() {
    let h = handle();
    let first = h.analyze("sabaru");
    assert!(!first.is_empty());
    for _ in 0..5 {
        assert_eq!(h.analyze("sabaru"), first);
    }
}

#[test]
fn frequencies_override_scores() {
    let mut h = handle();
    assert_eq!(h.analyze("sabar")[0].pos(), Some("v"));

    let freq = JsonFrequencies::from_path(data_dir().join("freq.json")).unwrap();
    h.set_frequencies(freq);
    let results = h.analyze("sabar");
    assert_eq!(results[0].pos(), Some("n"));
    assert_eq!(results[0].root(), "sabar");
}

#[test]
fn batch_preserves_input_order() {
    let h = handle();
    let words = ["sabar", "xyz", "saber", "gadaru"];
    let batch = h.analyze_batch(&words[..]);
    assert_eq!(batch.len(), words.len());
    for (word, results) in words.iter().zip(&batch) {
        assert_eq!(results, &h.analyze(word), "{word}");
    }
    assert!(batch[1].is_empty());
    assert_eq!(batch[3][0].root(), "g|d|r");
}

#[test]
fn exhausted_budget_returns_partial_results() {
    let mut h = handle();
    let full = h.analyze_report("sabaru");
    assert!(!full.exhausted);
    assert_eq!(full.analyses.len(), 3);

    // The verb cascade needs nine arcs, the second of its `pass` epsilons
    // being the last; the noun cascade needs seven.
    h.set_options(SearchOptions::default().with_max_explored(8));
    let limited = h.analyze_report("sabaru");
    assert!(limited.exhausted);
    assert_eq!(limited.analyses.len(), 2);
    assert!(limited.analyses.iter().all(|a| full.analyses.contains(a)));
    assert_eq!(limited.analyses, h.analyze("sabaru"));
    assert!(limited.analyses.iter().any(|a| a.pos() == Some("n")));
    assert!(limited.analyses.iter().any(|a| a.pos() == Some("v")));
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[test]
fn generation_follows_the_request() {
    let h = handle();
    let forms = h.generate("s|b|r", &fs("[pos=v,tm=imf,-pl]"));
    assert_eq!(surfaces(&forms), vec!["saber"]);
    assert_eq!(
        forms[0].features.get("pass").and_then(|v| v.as_flag()),
        Some(false)
    );

    // Active and passive perfectives share a surface form.
    let plural = h.generate("s|b|r", &fs("[pos=v,tm=prf,+pl]"));
    assert_eq!(surfaces(&plural), vec!["sabaru", "sabaru"]);
    assert_ne!(plural[0].features, plural[1].features);
}

#[test]
fn generation_without_pos_uses_all_cascades() {
    let h = handle();
    let forms = h.generate("sabar", &fs("[+def]"));
    assert_eq!(surfaces(&forms), vec!["sabaru"]);
    assert!(h.generate("s|b|r", &fs("[pos=n,+def]")).is_empty());
}

#[test]
fn impossible_request_generates_nothing() {
    let h = handle();
    assert!(h.generate("s|b|r", &fs("[pos=v,tm=imf,+pass]")).is_empty());
    let err = h.generate_in("adj", "s|b|r", &fs("[tm=imf]")).unwrap_err();
    assert!(matches!(err, MorphError::UnknownCascade(ref name) if name == "adj"));
}

#[test]
fn guessed_generation_relaxes_the_request() {
    let mut h = handle();
    let request = fs("[pos=v,tm=imf,+pass,-pl]");

    // Default policy drops attributes in reverse name order: `tm` goes first.
    assert_eq!(surfaces(&h.generate_guess("s|b|r", &request)), vec!["sabar"]);

    h.set_relaxation(Relaxation::new(["pass"]));
    assert_eq!(surfaces(&h.generate_guess("s|b|r", &request)), vec!["saber"]);

    h.set_relaxation(Relaxation::new(["pass"]).with_max_dropped(Some(0)));
    assert!(h.generate_guess("s|b|r", &request).is_empty());
}

#[test]
fn request_notation_errors_are_reported() {
    let h = handle();
    let err = h.generate_str("s|b|r", "[tm=imf").unwrap_err();
    assert!(matches!(err, MorphError::Request(_)));
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn missing_cascade_fails_to_load() {
    let err = MorphHandle::load_dir(data_dir(), &["v", "adj"]).unwrap_err();
    assert!(matches!(err, MorphError::Compile(_)));
}

#[test]
fn compile_errors_are_collected() {
    let source = MemorySource::new()
        .with("bad.cas", ">one<\n>two<\n")
        .with("one.fst", "s -> e [Z-a]\ne ->\n")
        .with("two.fst", "s -> e [a]\n");
    let mut h = MorphHandle::new();
    match h.load_cascade(&source, "bad") {
        Err(MorphError::Compile(err)) => assert_eq!(err.errors().len(), 2),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(h.cascade_names().count(), 0);
}
