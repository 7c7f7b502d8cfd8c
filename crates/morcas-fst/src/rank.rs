// Ranking of complete candidates.

use std::cmp::Ordering;

use crate::symbols::{Alphabet, Symbol};
use crate::traverse::Candidate;
use crate::weighting::{Weight, Weighting};

/// External statistics used to rank outputs, e.g. root or lexeme counts.
pub trait FrequencyTable: Send + Sync {
    /// Frequency of an output with the given weight, if known.
    fn frequency(&self, output: &str, weight: &Weight) -> Option<f64>;
}

/// The table that knows nothing; ranking falls back to the weighting score.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFrequencies;

impl FrequencyTable for NoFrequencies {
    fn frequency(&self, _output: &str, _weight: &Weight) -> Option<f64> {
        None
    }
}

/// A candidate with its rank keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub output: String,
    pub symbols: Vec<Symbol>,
    pub weight: Weight,
    pub frequency: Option<f64>,
    pub score: f64,
}

/// Best-first order: higher frequency, then higher score. Unknown
/// frequencies sort below known ones.
pub fn rank_order(a: &Ranked, b: &Ranked) -> Ordering {
    by_frequency(b.frequency, a.frequency).then_with(|| b.score.total_cmp(&a.score))
}

fn by_frequency(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Split merged weights into alternatives, score them and keep the best
/// `nbest` (all when `None`).
///
/// Ordering is [`rank_order`]. The sort is stable, so ties keep traversal
/// order and the result is deterministic.
pub fn rank(
    alphabet: &Alphabet,
    weighting: &dyn Weighting,
    candidates: Vec<Candidate>,
    frequencies: &dyn FrequencyTable,
    nbest: Option<usize>,
) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = candidates
        .into_iter()
        .flat_map(|candidate| {
            let output = alphabet.render(&candidate.output);
            weighting
                .split(&candidate.weight)
                .into_iter()
                .map(move |weight| Ranked {
                    frequency: frequencies.frequency(&output, &weight),
                    score: weighting.score(&weight),
                    output: output.clone(),
                    symbols: candidate.output.clone(),
                    weight,
                })
        })
        .collect();

    ranked.sort_by(rank_order);
    if let Some(n) = nbest {
        ranked.truncate(n);
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weighting::{Tropical, Unification};

    struct Counts;

    impl FrequencyTable for Counts {
        fn frequency(&self, output: &str, _weight: &Weight) -> Option<f64> {
            match output {
                "b|c" => Some(10.0),
                "d|c" => Some(3.0),
                _ => None,
            }
        }
    }

    fn alphabet() -> Alphabet {
        let mut a = Alphabet::new();
        for s in ["b", "c", "d", "|"] {
            a.intern(s);
        }
        a
    }

    fn candidate(a: &Alphabet, text: &str, weight: &str) -> Candidate {
        Candidate {
            output: a.segment(text).unwrap(),
            weight: Unification.parse(weight).unwrap(),
        }
    }

    #[test]
    fn frequency_then_specificity() {
        let a = alphabet();
        let cands = vec![
            candidate(&a, "c|c", "[pos=v,+neg]"),
            candidate(&a, "d|c", "[pos=v]"),
            candidate(&a, "b|c", "[]"),
            candidate(&a, "b|b", "[pos=n,+def,-pl]"),
        ];
        let got: Vec<String> = rank(&a, &Unification, cands, &Counts, None)
            .into_iter()
            .map(|r| r.output)
            .collect();
        assert_eq!(got, vec!["b|c", "d|c", "b|b", "c|c"]);
    }

    #[test]
    fn split_alternatives_are_ranked_separately() {
        let a = alphabet();
        let cands = vec![candidate(&a, "b|c", "[pos=v];[pos=n,+def]")];
        let ranked = rank(&a, &Unification, cands, &NoFrequencies, None);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].score, 2.0);
        assert_eq!(ranked[1].score, 1.0);
    }

    #[test]
    fn nbest_truncates_after_sorting() {
        let a = alphabet();
        let cands = vec![
            candidate(&a, "b|b", "[]"),
            candidate(&a, "c|c", "[+x,+y]"),
            candidate(&a, "d|d", "[+x]"),
        ];
        let ranked = rank(&a, &Unification, cands, &NoFrequencies, Some(2));
        let got: Vec<&str> = ranked.iter().map(|r| r.output.as_str()).collect();
        assert_eq!(got, vec!["c|c", "d|d"]);
        assert!(rank(&a, &Unification, Vec::new(), &NoFrequencies, Some(0)).is_empty());
    }

    #[test]
    fn ties_keep_traversal_order() {
        let a = alphabet();
        let cands = vec![
            candidate(&a, "d|d", "[+x]"),
            candidate(&a, "b|b", "[+y]"),
        ];
        let ranked = rank(&a, &Unification, cands, &NoFrequencies, None);
        assert_eq!(ranked[0].output, "d|d");
    }

    #[test]
    fn tropical_prefers_lower_cost() {
        let a = alphabet();
        let cands = vec![
            Candidate { output: a.segment("b").unwrap(), weight: Weight::Scalar(2.0) },
            Candidate { output: a.segment("c").unwrap(), weight: Weight::Scalar(0.5) },
        ];
        let ranked = rank(&a, &Tropical, cands, &NoFrequencies, None);
        assert_eq!(ranked[0].output, "c");
    }
}
