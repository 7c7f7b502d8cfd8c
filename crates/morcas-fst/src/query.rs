// Analysis and generation entry points on a compiled cascade.

use log::debug;
use morcas_core::FsSet;

use crate::cascade::Cascade;
use crate::config::SearchOptions;
use crate::rank::{FrequencyTable, NoFrequencies, Ranked, rank};
use crate::symbols::Symbol;
use crate::traverse::{Direction, Transduction, transduce};
use crate::weighting::Weight;

/// Ranked results of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub ranked: Vec<Ranked>,
    /// The search budget ran out; `ranked` may be missing results.
    pub exhausted: bool,
    /// Arcs explored by the query.
    pub explored: usize,
}

impl Cascade {
    /// Analyze a surface word: every lexical form the cascade maps it to,
    /// best first.
    ///
    /// A word containing material outside the cascade's alphabet has no
    /// analyses.
    pub fn analyze(&self, word: &str, options: &SearchOptions) -> Vec<Ranked> {
        self.analyze_with(word, options, &NoFrequencies)
    }

    /// [`analyze`](Self::analyze), ranking with external frequencies.
    pub fn analyze_with(
        &self,
        word: &str,
        options: &SearchOptions,
        frequencies: &dyn FrequencyTable,
    ) -> Vec<Ranked> {
        self.analyze_report(word, options, frequencies).ranked
    }

    /// [`analyze_with`](Self::analyze_with), also telling whether the
    /// search was cut short.
    pub fn analyze_report(
        &self,
        word: &str,
        options: &SearchOptions,
        frequencies: &dyn FrequencyTable,
    ) -> Report {
        let Some(input) = self.segment(word) else {
            debug!("{}: `{word}` contains unknown symbols", self.name());
            return Report::default();
        };
        self.analyze_symbols(&input, options, frequencies)
    }

    /// Analyze an already segmented input.
    pub fn analyze_symbols(
        &self,
        input: &[Symbol],
        options: &SearchOptions,
        frequencies: &dyn FrequencyTable,
    ) -> Report {
        let initial = self
            .initial_weight()
            .cloned()
            .unwrap_or_else(|| self.weighting().one());
        let result = self.transduce(input, Direction::Analysis, &initial, options);
        self.report(result, frequencies, options)
    }

    /// Generate surface forms of a lexical string whose path weights are
    /// compatible with `request`.
    pub fn generate(&self, root: &str, request: &Weight, options: &SearchOptions) -> Vec<Ranked> {
        self.generate_report(root, request, options).ranked
    }

    /// [`generate`](Self::generate), also telling whether the search was
    /// cut short.
    pub fn generate_report(&self, root: &str, request: &Weight, options: &SearchOptions) -> Report {
        let Some(input) = self.segment(root) else {
            debug!("{}: `{root}` contains unknown symbols", self.name());
            return Report::default();
        };
        let result = self.transduce(&input, Direction::Generation, request, options);
        self.report(result, &NoFrequencies, options)
    }

    /// [`generate`](Self::generate) with a feature request.
    pub fn generate_features(
        &self,
        root: &str,
        request: &FsSet,
        options: &SearchOptions,
    ) -> Vec<Ranked> {
        let request = self.weighting().request(request.clone());
        self.generate(root, &request, options)
    }

    fn report(
        &self,
        result: Transduction,
        frequencies: &dyn FrequencyTable,
        options: &SearchOptions,
    ) -> Report {
        Report {
            ranked: rank(
                self.alphabet(),
                self.weighting(),
                result.candidates,
                frequencies,
                options.nbest,
            ),
            exhausted: result.exhausted,
            explored: result.explored,
        }
    }

    /// Whether the word has at least one analysis.
    pub fn accepts(&self, word: &str) -> bool {
        !self
            .analyze(word, &SearchOptions::default().with_nbest(1))
            .is_empty()
    }

    /// Low-level traversal, reporting budget exhaustion.
    pub fn transduce(
        &self,
        input: &[Symbol],
        direction: Direction,
        initial: &Weight,
        options: &SearchOptions,
    ) -> Transduction {
        let result = transduce(self, input, direction, initial, options);
        debug!(
            "{} {:?}: {} candidates, {} arcs explored{}",
            self.name(),
            direction,
            result.candidates.len(),
            result.explored,
            if result.exhausted { " (budget exhausted)" } else { "" }
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morcas_core::FeatureStructure;

    const ROOTS: &str = "\
C = {b, bW, c, d, g}
start -> c1 [C]
c1 -> b1 [|]
b1 -> c2 [C]
c2 ->
";

    #[test]
    fn analyze_and_accept() {
        let c = Cascade::compile_fst("roots", ROOTS).unwrap();
        let r = c.analyze("b|c", &SearchOptions::default());
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].output, "b|c");
        assert!(c.accepts("bW|d"));
        assert!(!c.accepts("b|"));
        assert!(!c.accepts("x|b"));
    }

    #[test]
    fn unknown_word_has_no_analysis() {
        let c = Cascade::compile_fst("roots", ROOTS).unwrap();
        assert!(c.analyze("zzz", &SearchOptions::default()).is_empty());
        assert!(c.analyze("", &SearchOptions::default()).is_empty());
    }

    #[test]
    fn initial_weight_constrains_analysis() {
        let text = "s -> e [a] [pos=v]\ns -> e [b] [pos=n]\ne ->\n";
        let c = Cascade::compile_fst("t", text)
            .unwrap()
            .with_initial_weight(FeatureStructure::new().with("pos", "n").into());
        assert!(c.analyze("a", &SearchOptions::default()).is_empty());
        assert_eq!(c.analyze("b", &SearchOptions::default()).len(), 1);
    }

    #[test]
    fn generation_drops_incompatible_paths() {
        let text = "\
s -> m [b]
m -> e [a:] [tm=prf]
e ->
";
        let c = Cascade::compile_fst("t", text).unwrap();
        let prf: FsSet = "[tm=prf]".parse().unwrap();
        let imf: FsSet = "[tm=imf]".parse().unwrap();
        assert_eq!(c.generate_features("b", &prf, &SearchOptions::default()).len(), 1);
        assert!(c.generate_features("b", &imf, &SearchOptions::default()).is_empty());
    }

    #[test]
    fn generation_inverts_analysis() {
        let text = "\
s -> m [b]
m -> e [a:] [tm=prf]
m -> e [u:] [tm=imf]
e ->
";
        let c = Cascade::compile_fst("t", text).unwrap();
        let analyses = c.analyze("bu", &SearchOptions::default());
        assert_eq!(analyses[0].output, "b");
        let request: FsSet = "[tm=imf]".parse().unwrap();
        let forms: Vec<String> = c
            .generate_features("b", &request, &SearchOptions::default())
            .into_iter()
            .map(|r| r.output)
            .collect();
        assert_eq!(forms, vec!["bu"]);
    }

    #[test]
    fn nbest_limits_results() {
        let c = Cascade::compile_fst("t", "s -> e [a:x;a:y;a:z]\ne ->\n").unwrap();
        assert_eq!(c.analyze("a", &SearchOptions::default()).len(), 3);
        assert_eq!(c.analyze("a", &SearchOptions::default().with_nbest(2)).len(), 2);
    }

    #[test]
    fn report_marks_partial_results() {
        let c = Cascade::compile_fst("t", "s -> e [a:x;a:y;a:z]\ne ->\n").unwrap();
        let full = c.analyze_report("a", &SearchOptions::default(), &NoFrequencies);
        assert!(!full.exhausted);
        assert_eq!(full.explored, 3);
        assert_eq!(full.ranked.len(), 3);

        let limited = SearchOptions::default().with_max_explored(2);
        let partial = c.analyze_report("a", &limited, &NoFrequencies);
        assert!(partial.exhausted);
        assert_eq!(partial.ranked.len(), 2);

        let request = c.weighting().one();
        let generated = c.generate_report("x", &request, &limited);
        assert!(!generated.exhausted);
        assert_eq!(generated.ranked.len(), 1);
    }
}
