// MorphHandle: the application-facing context object.
//
// Owns the compiled cascades, the frequency table and the options; every
// query method takes `&self`, so one handle can serve many threads.
//
// Design notes:
// - Cascades are kept in load order. Analysis runs all of them and ranks
//   the merged results; ties keep load order.
// - Guesser cascades are only consulted when no regular cascade yields an
//   analysis. Their results are marked with a `?` before the category.
// - Generation uses the cascade named by the request's `pos` when there is
//   one, all cascades otherwise.

use std::fmt;
use std::path::Path;

use log::debug;
use morcas_core::{ATTR_POS, AnalysisResult, FeatureStructure, FsSet, GeneratedForm};
use morcas_fst::{
    Cascade, DirSource, FrequencyTable, NoFrequencies, Ranked, RuleSource, SearchOptions,
    rank_order,
};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use smol_str::SmolStr;

use crate::relax::Relaxation;
use crate::{MorphError, extract};

/// Marks categories produced by guesser cascades.
const GUESS_MARK: &str = "?";

/// Analyses of one word, with whether any search ran out of budget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisReport {
    pub analyses: Vec<AnalysisResult>,
    /// Some cascade stopped early; `analyses` may be incomplete.
    pub exhausted: bool,
}

pub struct MorphHandle {
    cascades: Vec<(SmolStr, Cascade)>,
    guessers: Vec<(SmolStr, Cascade)>,
    frequencies: Box<dyn FrequencyTable>,
    options: SearchOptions,
    relaxation: Relaxation,
    use_guessers: bool,
}

impl fmt::Debug for MorphHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MorphHandle")
            .field("cascades", &self.cascade_names().collect::<Vec<_>>())
            .field(
                "guessers",
                &self.guessers.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            )
            .field("options", &self.options)
            .field("relaxation", &self.relaxation)
            .field("use_guessers", &self.use_guessers)
            .finish_non_exhaustive()
    }
}

impl Default for MorphHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl MorphHandle {
    /// An empty handle with default options and no frequency table.
    pub fn new() -> Self {
        Self {
            cascades: Vec::new(),
            guessers: Vec::new(),
            frequencies: Box::new(NoFrequencies),
            options: SearchOptions::default(),
            relaxation: Relaxation::default(),
            use_guessers: true,
        }
    }

    /// Compile `name.cas` for each of `names` from the directory `dir`.
    pub fn load_dir(dir: impl AsRef<Path>, names: &[&str]) -> Result<Self, MorphError> {
        let source = DirSource::new(dir.as_ref());
        let mut handle = Self::new();
        for name in names {
            handle.load_cascade(&source, name)?;
        }
        Ok(handle)
    }

    /// Compile `name.cas` from `source` and add it under `name`.
    pub fn load_cascade(&mut self, source: &dyn RuleSource, name: &str) -> Result<(), MorphError> {
        let cascade = Cascade::compile(source, name)?;
        self.add_cascade(name, cascade);
        Ok(())
    }

    /// Compile `name.cas` from `source` and add it as a guesser for the
    /// category `category`.
    pub fn load_guesser(
        &mut self,
        source: &dyn RuleSource,
        name: &str,
        category: &str,
    ) -> Result<(), MorphError> {
        let cascade = Cascade::compile(source, name)?;
        self.add_guesser(category, cascade);
        Ok(())
    }

    /// Add a compiled cascade, replacing one with the same name.
    pub fn add_cascade(&mut self, name: &str, cascade: Cascade) {
        debug!("adding cascade {name} ({} stages)", cascade.stages().len());
        insert_named(&mut self.cascades, name, cascade);
    }

    pub fn add_guesser(&mut self, category: &str, cascade: Cascade) {
        debug!("adding guesser {category} ({} stages)", cascade.stages().len());
        insert_named(&mut self.guessers, category, cascade);
    }

    pub fn cascade(&self, name: &str) -> Option<&Cascade> {
        self.cascades
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    pub fn cascade_names(&self) -> impl Iterator<Item = &str> {
        self.cascades.iter().map(|(n, _)| n.as_str())
    }

    // -- Options --

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: SearchOptions) {
        self.options = options;
    }

    pub fn set_frequencies(&mut self, frequencies: impl FrequencyTable + 'static) {
        self.frequencies = Box::new(frequencies);
    }

    pub fn relaxation(&self) -> &Relaxation {
        &self.relaxation
    }

    pub fn set_relaxation(&mut self, relaxation: Relaxation) {
        self.relaxation = relaxation;
    }

    pub fn set_use_guessers(&mut self, enabled: bool) {
        self.use_guessers = enabled;
    }

    // -- Analysis --

    /// All analyses of `word`, best first, cut to the handle's n-best.
    ///
    /// A word no cascade accepts yields an empty list.
    pub fn analyze(&self, word: &str) -> Vec<AnalysisResult> {
        self.analyze_limited(word, self.options.nbest).analyses
    }

    /// [`analyze`](Self::analyze), also telling whether the search budget
    /// ran out.
    pub fn analyze_report(&self, word: &str) -> AnalysisReport {
        self.analyze_limited(word, self.options.nbest)
    }

    /// The `n` best analyses of `word`.
    pub fn analyze_nbest(&self, word: &str, n: usize) -> Vec<AnalysisResult> {
        self.analyze_limited(word, Some(n)).analyses
    }

    /// Analyze many words in parallel. Results are in input order.
    pub fn analyze_batch<S>(&self, words: &[S]) -> Vec<Vec<AnalysisResult>>
    where
        S: AsRef<str> + Sync,
    {
        #[cfg(feature = "parallel")]
        let iter = words.par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = words.iter();
        iter.map(|word| self.analyze(word.as_ref())).collect()
    }

    fn analyze_limited(&self, word: &str, nbest: Option<usize>) -> AnalysisReport {
        let (mut found, mut exhausted) = self.collect_analyses(&self.cascades, word, "");
        if found.is_empty() && self.use_guessers && !self.guessers.is_empty() {
            debug!("no analysis for `{word}`; trying guessers");
            let (guessed, guess_exhausted) = self.collect_analyses(&self.guessers, word, GUESS_MARK);
            found = guessed;
            exhausted |= guess_exhausted;
        }
        found.sort_by(|(_, a), (_, b)| rank_order(a, b));
        if let Some(n) = nbest {
            found.truncate(n);
        }
        AnalysisReport {
            analyses: found
                .into_iter()
                .map(|(category, ranked)| extract::analysis(&category, ranked))
                .collect(),
            exhausted,
        }
    }

    fn collect_analyses(
        &self,
        cascades: &[(SmolStr, Cascade)],
        word: &str,
        mark: &str,
    ) -> (Vec<(String, Ranked)>, bool) {
        let options = SearchOptions {
            nbest: None,
            ..self.options
        };
        let mut found = Vec::new();
        let mut exhausted = false;
        for (name, cascade) in cascades {
            let report = cascade.analyze_report(word, &options, self.frequencies.as_ref());
            exhausted |= report.exhausted;
            found.extend(
                report
                    .ranked
                    .into_iter()
                    .map(|ranked| (format!("{mark}{name}"), ranked)),
            );
        }
        (found, exhausted)
    }

    // -- Generation --

    /// Surface forms of `root` compatible with `request`, best first.
    pub fn generate(&self, root: &str, request: &FeatureStructure) -> Vec<GeneratedForm> {
        let request_set = FsSet::single(request.clone());
        let mut found: Vec<Ranked> = self
            .generation_cascades(request)
            .flat_map(|cascade| cascade.generate_features(root, &request_set, &self.options))
            .collect();
        found.sort_by(rank_order);
        if let Some(n) = self.options.nbest {
            found.truncate(n);
        }
        found
            .into_iter()
            .map(|ranked| extract::generated(ranked, request))
            .collect()
    }

    /// [`generate`](Self::generate) with a request in `[a=v,...]` notation.
    pub fn generate_str(&self, root: &str, request: &str) -> Result<Vec<GeneratedForm>, MorphError> {
        let request: FeatureStructure = request.parse()?;
        Ok(self.generate(root, &request))
    }

    /// Generate with one named cascade.
    pub fn generate_in(
        &self,
        name: &str,
        root: &str,
        request: &FeatureStructure,
    ) -> Result<Vec<GeneratedForm>, MorphError> {
        let cascade = self
            .cascade(name)
            .ok_or_else(|| MorphError::UnknownCascade(name.to_string()))?;
        let request_set = FsSet::single(request.clone());
        Ok(cascade
            .generate_features(root, &request_set, &self.options)
            .into_iter()
            .map(|ranked| extract::generated(ranked, request))
            .collect())
    }

    /// Like [`generate`](Self::generate), but when nothing can be generated
    /// the request is relaxed step by step according to the handle's
    /// [`Relaxation`] policy, and the first step that yields forms wins.
    pub fn generate_guess(&self, root: &str, request: &FeatureStructure) -> Vec<GeneratedForm> {
        let forms = self.generate(root, request);
        if !forms.is_empty() {
            return forms;
        }
        for relaxed in self.relaxation.steps(request) {
            debug!("generating {root} with relaxed request {relaxed}");
            let forms = self.generate(root, &relaxed);
            if !forms.is_empty() {
                return forms;
            }
        }
        Vec::new()
    }

    fn generation_cascades<'a>(
        &'a self,
        request: &FeatureStructure,
    ) -> Box<dyn Iterator<Item = &'a Cascade> + 'a> {
        let named = request
            .get(ATTR_POS)
            .and_then(|v| v.as_atom())
            .and_then(|pos| self.cascade(pos));
        match named {
            Some(cascade) => Box::new(std::iter::once(cascade)),
            None => Box::new(self.cascades.iter().map(|(_, c)| c)),
        }
    }
}

fn insert_named(list: &mut Vec<(SmolStr, Cascade)>, name: &str, cascade: Cascade) {
    match list.iter_mut().find(|(n, _)| n == name) {
        Some(slot) => slot.1 = cascade,
        None => list.push((SmolStr::new(name), cascade)),
    }
}
