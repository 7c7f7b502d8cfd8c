// Ranked cascade output to result types.

use morcas_core::{ATTR_POS, AnalysisResult, FeatureStructure, GeneratedForm, Value};
use morcas_fst::{Ranked, Weight};

/// The feature structure carried by a ranked (already split) weight.
fn features_of(weight: &Weight) -> Option<FeatureStructure> {
    weight.as_features()?.iter().next().cloned()
}

/// Build an analysis. `category` names the cascade that produced it and is
/// used as the part of speech when the features do not carry one.
pub(crate) fn analysis(category: &str, ranked: Ranked) -> AnalysisResult {
    let mut features = features_of(&ranked.weight).unwrap_or_default();
    if !matches!(features.get(ATTR_POS), Some(Value::Atom(_))) && !category.is_empty() {
        features.insert(ATTR_POS, category);
    }
    AnalysisResult::new(ranked.output, features, ranked.score)
}

/// Build a generated form. Scalar weightings carry no features, so the
/// request stands in for them.
pub(crate) fn generated(ranked: Ranked, request: &FeatureStructure) -> GeneratedForm {
    GeneratedForm {
        features: features_of(&ranked.weight).unwrap_or_else(|| request.clone()),
        surface: ranked.output,
        score: ranked.score,
    }
}
