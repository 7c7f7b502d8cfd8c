//! Morphological analysis and generation over compiled morcas cascades.
//!
//! [`MorphHandle`] is the context object applications hold: a set of named
//! cascades (typically one per part of speech), optional guesser cascades
//! tried when nothing else matches, a frequency table for ranking and the
//! search options. It turns ranked cascade output into
//! [`AnalysisResult`](morcas_core::AnalysisResult) and
//! [`GeneratedForm`](morcas_core::GeneratedForm) values.
//!
//! - [`handle`] -- [`MorphHandle`]
//! - [`frequency`] -- frequency tables loaded from JSON or built in memory
//! - [`relax`] -- the relaxation policy used by guessed generation
//! - `extract` -- ranked candidates to result types

mod extract;
pub mod frequency;
pub mod handle;
pub mod relax;

use std::path::PathBuf;

pub use frequency::{JsonFrequencies, MapFrequencies};
pub use handle::{AnalysisReport, MorphHandle};
pub use relax::Relaxation;

/// Error type for handle construction and queries.
#[derive(Debug, thiserror::Error)]
pub enum MorphError {
    /// A cascade failed to compile.
    #[error(transparent)]
    Compile(#[from] morcas_fst::CompileError),

    /// No cascade with this name is loaded.
    #[error("unknown cascade: {0}")]
    UnknownCascade(String),

    /// A frequency file could not be read.
    #[error("cannot read frequency table {}: {source}", path.display())]
    FrequencyIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A frequency table is not a JSON object of numbers.
    #[error("invalid frequency table: {0}")]
    FrequencyFormat(#[from] serde_json::Error),

    /// A feature request could not be parsed.
    #[error("invalid feature request: {0}")]
    Request(#[from] morcas_core::FeatureParseError),
}
