// Weighting policies.
//
// A cascade carries one policy for all of its arcs. Each policy is a
// semiring: `combine` extends a path, `add` merges two paths that produce
// the same output, `one` is the weight of the empty path. Under
// unification `combine` can fail, which prunes the path.

use std::fmt;
use std::sync::Arc;

use morcas_core::{FeatureStructure, FsSet};

/// Weight carried by arcs and accumulated along paths.
#[derive(Debug, Clone, PartialEq)]
pub enum Weight {
    /// Disjunction of feature structures (unification weighting).
    Features(FsSet),
    /// Probability or tropical cost.
    Scalar(f64),
}

impl Weight {
    pub fn as_features(&self) -> Option<&FsSet> {
        match self {
            Weight::Features(set) => Some(set),
            Weight::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Weight::Scalar(value) => Some(*value),
            Weight::Features(_) => None,
        }
    }
}

impl From<FsSet> for Weight {
    fn from(set: FsSet) -> Self {
        Weight::Features(set)
    }
}

impl From<FeatureStructure> for Weight {
    fn from(fs: FeatureStructure) -> Self {
        Weight::Features(FsSet::single(fs))
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weight::Features(set) => write!(f, "{set}"),
            Weight::Scalar(value) => write!(f, "{value}"),
        }
    }
}

/// A weight annotation could not be parsed under the active policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {mode} weight `{text}`: {message}")]
pub struct WeightError {
    pub mode: &'static str,
    pub text: String,
    pub message: String,
}

/// Weight algebra used by a cascade.
pub trait Weighting: fmt::Debug + Send + Sync {
    /// Mode name as written after `weighting =`.
    fn name(&self) -> &'static str;

    /// Weight of the empty path; the identity for [`combine`](Self::combine).
    fn one(&self) -> Weight;

    /// Parse the text of an arc weight, brackets included. Empty text is `one`.
    fn parse(&self, text: &str) -> Result<Weight, WeightError>;

    /// Extend a path. `None` means the path is dead.
    fn combine(&self, a: &Weight, b: &Weight) -> Option<Weight>;

    /// Merge two paths with the same output.
    fn add(&self, a: &Weight, b: &Weight) -> Weight;

    /// Ranking key; higher is better.
    fn score(&self, weight: &Weight) -> f64;

    /// Break a merged weight into the alternatives reported to callers.
    fn split(&self, weight: &Weight) -> Vec<Weight> {
        vec![weight.clone()]
    }

    /// Turn a generation request into a path constraint.
    ///
    /// Scalar policies carry no features, so a request cannot constrain
    /// their paths and becomes `one`.
    fn request(&self, request: FsSet) -> Weight {
        let _ = request;
        self.one()
    }
}

/// Look up a policy by its mode name, ignoring case.
pub fn weighting_for(mode: &str) -> Option<Arc<dyn Weighting>> {
    match mode.trim().to_ascii_uppercase().as_str() {
        "UNIFICATION" => Some(Arc::new(Unification)),
        "PROBABILITY" => Some(Arc::new(Probability)),
        "TROPICAL" => Some(Arc::new(Tropical)),
        _ => None,
    }
}

/// Feature-structure sets combined by unification and merged by union.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unification;

impl Weighting for Unification {
    fn name(&self) -> &'static str {
        "UNIFICATION"
    }

    fn one(&self) -> Weight {
        Weight::Features(FsSet::top())
    }

    fn parse(&self, text: &str) -> Result<Weight, WeightError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(self.one());
        }
        text.parse::<FsSet>()
            .map(Weight::Features)
            .map_err(|err| WeightError {
                mode: self.name(),
                text: text.to_string(),
                message: err.to_string(),
            })
    }

    fn combine(&self, a: &Weight, b: &Weight) -> Option<Weight> {
        a.as_features()?
            .unify(b.as_features()?)
            .map(Weight::Features)
    }

    fn add(&self, a: &Weight, b: &Weight) -> Weight {
        match (a, b) {
            (Weight::Features(x), Weight::Features(y)) => Weight::Features(x.union(y)),
            _ => a.clone(),
        }
    }

    /// The most specific alternative wins.
    fn score(&self, weight: &Weight) -> f64 {
        weight
            .as_features()
            .and_then(|set| set.iter().map(FeatureStructure::specificity).max())
            .unwrap_or(0) as f64
    }

    fn split(&self, weight: &Weight) -> Vec<Weight> {
        match weight {
            Weight::Features(set) => set
                .iter()
                .cloned()
                .map(|fs| Weight::Features(FsSet::single(fs)))
                .collect(),
            other => vec![other.clone()],
        }
    }

    fn request(&self, request: FsSet) -> Weight {
        Weight::Features(request)
    }
}

fn parse_scalar(mode: &'static str, text: &str) -> Result<Option<f64>, WeightError> {
    let inner = text
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();
    if inner.is_empty() {
        return Ok(None);
    }
    let value: f64 = inner.parse().map_err(|_| WeightError {
        mode,
        text: text.to_string(),
        message: "expected a number".to_string(),
    })?;
    if !value.is_finite() {
        return Err(WeightError {
            mode,
            text: text.to_string(),
            message: "weight must be finite".to_string(),
        });
    }
    Ok(Some(value))
}

/// Probabilities: product along a path, sum across paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct Probability;

impl Weighting for Probability {
    fn name(&self) -> &'static str {
        "PROBABILITY"
    }

    fn one(&self) -> Weight {
        Weight::Scalar(1.0)
    }

    fn parse(&self, text: &str) -> Result<Weight, WeightError> {
        match parse_scalar(self.name(), text)? {
            None => Ok(self.one()),
            Some(p) if p < 0.0 => Err(WeightError {
                mode: self.name(),
                text: text.to_string(),
                message: "probability must not be negative".to_string(),
            }),
            Some(p) => Ok(Weight::Scalar(p)),
        }
    }

    fn combine(&self, a: &Weight, b: &Weight) -> Option<Weight> {
        let product = a.as_scalar()? * b.as_scalar()?;
        // zero is the semiring's annihilator
        (product > 0.0).then_some(Weight::Scalar(product))
    }

    fn add(&self, a: &Weight, b: &Weight) -> Weight {
        match (a.as_scalar(), b.as_scalar()) {
            (Some(x), Some(y)) => Weight::Scalar(x + y),
            _ => a.clone(),
        }
    }

    fn score(&self, weight: &Weight) -> f64 {
        weight.as_scalar().unwrap_or(0.0)
    }
}

/// Costs: sum along a path, minimum across paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tropical;

impl Weighting for Tropical {
    fn name(&self) -> &'static str {
        "TROPICAL"
    }

    fn one(&self) -> Weight {
        Weight::Scalar(0.0)
    }

    fn parse(&self, text: &str) -> Result<Weight, WeightError> {
        Ok(parse_scalar(self.name(), text)?.map_or_else(|| self.one(), Weight::Scalar))
    }

    fn combine(&self, a: &Weight, b: &Weight) -> Option<Weight> {
        Some(Weight::Scalar(a.as_scalar()? + b.as_scalar()?))
    }

    fn add(&self, a: &Weight, b: &Weight) -> Weight {
        match (a.as_scalar(), b.as_scalar()) {
            (Some(x), Some(y)) => Weight::Scalar(x.min(y)),
            _ => a.clone(),
        }
    }

    /// Lower cost ranks higher.
    fn score(&self, weight: &Weight) -> f64 {
        weight.as_scalar().map_or(f64::NEG_INFINITY, |cost| -cost)
    }
}
