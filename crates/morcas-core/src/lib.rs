//! Shared types for morcas: feature structures, unification and the
//! result types handed to external formatting code.
//!
//! - [`features`] -- [`FeatureStructure`], [`Value`] and unification
//! - [`fsset`] -- [`FsSet`], disjunctions of feature structures
//! - [`analysis`] -- [`AnalysisResult`] and [`GeneratedForm`]

pub mod analysis;
pub mod features;
pub mod fsset;

pub use analysis::{AnalysisResult, GeneratedForm};
pub use features::{ATTR_POS, FeatureParseError, FeatureStructure, Value};
pub use fsset::FsSet;
