//! Rule compiler and weighted transducer cascade engine.
//!
//! This crate compiles the `.fst` / `.cas` rule language into cascades of
//! nondeterministic transducers whose arcs carry weights, and runs those
//! cascades for analysis (surface to lexical) and generation (lexical plus
//! a feature request to surface).
//!
//! # Architecture
//!
//! - [`symbols`] -- Alphabet: symbol interning and word segmentation
//! - [`classes`] -- Named string sets with subtraction and intersection
//! - [`grammar`] -- Intermediate grammar produced by the parser
//! - [`parser`] -- `.fst` and `.cas` text to grammar
//! - [`transition`] / [`transducer`] -- Arena-indexed compiled transducers
//! - [`builder`] -- Grammar to transducer, with class resolution
//! - [`weighting`] -- Pluggable weight policies (unification, probability, tropical)
//! - [`source`] -- Where rule files come from (directory or memory)
//! - [`cascade`] -- Ordered stages sharing one alphabet and weighting
//! - [`config`] -- Search options and the per-query budget
//! - [`traverse`] -- Memoized traversal of a cascade
//! - [`rank`] -- Candidate ranking and the n-best cutoff
//! - [`query`] -- `analyze` / `generate` entry points

pub mod builder;
pub mod cascade;
pub mod classes;
pub mod config;
pub mod grammar;
pub mod parser;
pub mod query;
pub mod rank;
pub mod source;
pub mod symbols;
pub mod transducer;
pub mod transition;
pub mod traverse;
pub mod weighting;

use std::fmt;

use smol_str::SmolStr;

pub use cascade::Cascade;
pub use config::SearchOptions;
pub use query::Report;
pub use rank::{FrequencyTable, NoFrequencies, Ranked, rank_order};
pub use source::{DirSource, MemorySource, RuleSource};
pub use symbols::{Alphabet, Symbol};
pub use traverse::Direction;
pub use weighting::{Weight, Weighting};

/// Default limit on the number of arcs explored by one query.
///
/// Acts as a safety limit against exponential blow-up on pathological
/// inputs; when reached, the query returns what it found so far.
pub const MAX_EXPLORED: usize = 1_000_000;

/// File and line a compile error refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: SmolStr,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<SmolStr>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Error raised while loading rule files and compiling cascades.
///
/// Compile errors are fatal for the cascade being compiled. Failures during
/// search (a unification that fails, an input that does not match) are not
/// errors; they only remove candidates.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{location}: syntax error: {message}")]
    Syntax {
        location: SourceLocation,
        message: String,
    },
    #[error("{location}: undefined class `{name}`")]
    UndefinedClass {
        location: SourceLocation,
        name: SmolStr,
    },
    #[error("{location}: malformed automaton `{fst}`: {message}")]
    MalformedAutomaton {
        location: SourceLocation,
        fst: SmolStr,
        message: String,
    },
    #[error("{location}: unknown weighting mode `{mode}`")]
    UnknownWeightMode {
        location: SourceLocation,
        mode: String,
    },
    #[error("{location}: cascade stage `{name}` has no rule file")]
    UndeclaredStage {
        location: SourceLocation,
        name: SmolStr,
    },
    #[error("cannot read `{name}`: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{}", join_errors(.0))]
    Multiple(Vec<CompileError>),
}

impl CompileError {
    /// Collapse a list of errors into one. A single error is returned as-is.
    pub fn from_many(mut errors: Vec<CompileError>) -> CompileError {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            CompileError::Multiple(errors)
        }
    }

    /// Iterate over the individual errors, flattening `Multiple`.
    pub fn errors(&self) -> Vec<&CompileError> {
        match self {
            CompileError::Multiple(errors) => errors.iter().flat_map(CompileError::errors).collect(),
            other => vec![other],
        }
    }

    pub(crate) fn syntax(location: SourceLocation, message: impl Into<String>) -> Self {
        CompileError::Syntax {
            location,
            message: message.into(),
        }
    }
}

fn join_errors(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display() {
        assert_eq!(SourceLocation::new("root.fst", 12).to_string(), "root.fst:12");
    }

    #[test]
    fn from_many_unwraps_single_error() {
        let err = CompileError::from_many(vec![CompileError::syntax(
            SourceLocation::new("a.fst", 1),
            "bad",
        )]);
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn multiple_errors_flatten_and_join() {
        let err = CompileError::from_many(vec![
            CompileError::syntax(SourceLocation::new("a.fst", 1), "first"),
            CompileError::UndefinedClass {
                location: SourceLocation::new("a.fst", 2),
                name: "X".into(),
            },
        ]);
        assert_eq!(err.errors().len(), 2);
        let text = err.to_string();
        assert!(text.contains("a.fst:1: syntax error: first"));
        assert!(text.contains("a.fst:2: undefined class `X`"));
    }
}
