// Morphological analysis and generation result types.

use smol_str::SmolStr;

use crate::features::{ATTR_POS, FeatureStructure, Value};

/// One analysis of a surface word.
///
/// Holds the lexical side produced by the cascade (root or stem, with
/// boundary markers), the part of speech, the grammatical features and the
/// rank score. The citation form is left for an external lookup table to
/// fill in.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnalysisResult {
    root: String,
    pos: Option<SmolStr>,
    citation: Option<String>,
    features: FeatureStructure,
    score: f64,
}

impl AnalysisResult {
    /// Build a result from a lexical string and its final feature structure.
    ///
    /// The `pos` attribute, if it holds an atom, is lifted out of the
    /// feature structure into [`pos`](Self::pos).
    pub fn new(root: impl Into<String>, mut features: FeatureStructure, score: f64) -> Self {
        let pos = match features.get(ATTR_POS) {
            Some(Value::Atom(atom)) => Some(atom.clone()),
            _ => None,
        };
        if pos.is_some() {
            features.remove(ATTR_POS);
        }
        Self {
            root: root.into(),
            pos,
            citation: None,
            features,
            score,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn pos(&self) -> Option<&str> {
        self.pos.as_deref()
    }

    pub fn citation(&self) -> Option<&str> {
        self.citation.as_deref()
    }

    /// Attach a citation form looked up by the caller.
    pub fn set_citation(&mut self, citation: impl Into<String>) {
        self.citation = Some(citation.into());
    }

    /// Grammatical attributes, without `pos`.
    pub fn features(&self) -> &FeatureStructure {
        &self.features
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Attribute list in name order, for external formatting.
    pub fn attributes(&self) -> Vec<(&str, &Value)> {
        self.features.iter().collect()
    }
}

/// One generated surface form.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GeneratedForm {
    pub surface: String,
    pub features: FeatureStructure,
    pub score: f64,
}
