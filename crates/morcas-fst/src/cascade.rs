// Cascade compilation.
//
// A `.cas` file names the weighting, the shared classes, optional
// subcascades and the ordered stages; each stage `>name<` is compiled from
// `name.fst` read through the same `RuleSource`. All stages intern into one
// alphabet, so the output symbols of one stage are the input symbols of the
// next.

use std::io;
use std::sync::Arc;

use hashbrown::HashMap;
use log::debug;
use smol_str::SmolStr;

use crate::builder::build_transducer;
use crate::classes::ClassTable;
use crate::parser::{parse_cascade, parse_fst};
use crate::source::RuleSource;
use crate::symbols::{Alphabet, Symbol};
use crate::transducer::Transducer;
use crate::weighting::{Unification, Weight, Weighting, weighting_for};
use crate::{CompileError, SourceLocation};

/// An ordered sequence of transducers sharing an alphabet and a weighting.
///
/// Immutable once built and cheap to clone; stages are shared behind `Arc`.
#[derive(Debug, Clone)]
pub struct Cascade {
    name: SmolStr,
    stages: Vec<Arc<Transducer>>,
    /// `stages[i].inverted()`, used for generation.
    inverted: Vec<Arc<Transducer>>,
    weighting: Arc<dyn Weighting>,
    alphabet: Arc<Alphabet>,
    classes: ClassTable,
    subcascades: Vec<(SmolStr, Vec<usize>)>,
    initial_weight: Option<Weight>,
}

impl Cascade {
    /// Compile `name.cas` and its stages from `source`.
    pub fn compile(source: &dyn RuleSource, name: &str) -> Result<Cascade, CompileError> {
        let file_name = format!("{name}.cas");
        let text = read_required(source, &file_name)?;
        let grammar = parse_cascade(&file_name, &text)?;
        let mut errors = Vec::new();

        let weighting = match &grammar.weighting {
            None => Arc::new(Unification) as Arc<dyn Weighting>,
            Some(decl) => match weighting_for(&decl.mode) {
                Some(weighting) => weighting,
                None => {
                    return Err(CompileError::UnknownWeightMode {
                        location: SourceLocation::new(file_name.as_str(), decl.line),
                        mode: decl.mode.clone(),
                    });
                }
            },
        };

        let mut classes = ClassTable::new();
        for decl in &grammar.classes {
            if let Err(err) = classes.define_expr(&decl.name, &decl.expr) {
                errors.push(CompileError::UndefinedClass {
                    location: SourceLocation::new(file_name.as_str(), decl.line),
                    name: err.0,
                });
            }
        }

        let mut alphabet = Alphabet::new();
        let mut compiled: HashMap<SmolStr, Arc<Transducer>> = HashMap::new();
        let mut stages = Vec::with_capacity(grammar.stages.len());
        for stage in &grammar.stages {
            if let Some(existing) = compiled.get(&stage.name) {
                stages.push(Arc::clone(existing));
                continue;
            }
            let fst_name = format!("{}.fst", stage.name);
            let text = match source.read(&fst_name) {
                Ok(Some(text)) => text,
                Ok(None) => {
                    errors.push(CompileError::UndeclaredStage {
                        location: SourceLocation::new(file_name.as_str(), stage.line),
                        name: stage.name.clone(),
                    });
                    continue;
                }
                Err(source) => {
                    errors.push(CompileError::Io {
                        name: fst_name,
                        source,
                    });
                    continue;
                }
            };
            let built = parse_fst(&fst_name, &text).and_then(|fst| {
                build_transducer(&fst, &classes, &mut alphabet, weighting.as_ref())
            });
            match built {
                Ok(transducer) => {
                    let transducer = Arc::new(transducer);
                    compiled.insert(stage.name.clone(), Arc::clone(&transducer));
                    stages.push(transducer);
                }
                Err(err) => errors.extend(flatten(err)),
            }
        }

        let mut subcascades = Vec::with_capacity(grammar.subcascades.len());
        for decl in &grammar.subcascades {
            if let Some(&bad) = decl.indices.iter().find(|&&i| i >= grammar.stages.len()) {
                errors.push(CompileError::syntax(
                    SourceLocation::new(file_name.as_str(), decl.line),
                    format!(
                        "subcascade `{}` refers to stage {bad}, but there are {} stages",
                        decl.name,
                        grammar.stages.len()
                    ),
                ));
                continue;
            }
            subcascades.push((decl.name.clone(), decl.indices.clone()));
        }

        if !errors.is_empty() {
            return Err(CompileError::from_many(errors));
        }

        let cascade = Cascade::assemble(
            SmolStr::new(name),
            stages,
            alphabet,
            weighting,
            classes,
            subcascades,
        );
        debug!(
            "compiled cascade {} from {}: {} stages, {} symbols, weighting {}",
            cascade.name,
            source.describe(),
            cascade.stages.len(),
            cascade.alphabet.len(),
            cascade.weighting.name()
        );
        Ok(cascade)
    }

    /// Compile a single `.fst` text as a one-stage cascade under unification.
    pub fn compile_fst(name: &str, text: &str) -> Result<Cascade, CompileError> {
        let file_name = format!("{name}.fst");
        let grammar = parse_fst(&file_name, text)?;
        let mut alphabet = Alphabet::new();
        let transducer = build_transducer(&grammar, &ClassTable::new(), &mut alphabet, &Unification)?;
        Ok(Cascade::from_transducers(
            name,
            vec![transducer],
            alphabet,
            Arc::new(Unification),
        ))
    }

    /// Compose transducers that were built against `alphabet`.
    pub fn from_transducers(
        name: &str,
        stages: Vec<Transducer>,
        alphabet: Alphabet,
        weighting: Arc<dyn Weighting>,
    ) -> Cascade {
        Cascade::assemble(
            SmolStr::new(name),
            stages.into_iter().map(Arc::new).collect(),
            alphabet,
            weighting,
            ClassTable::new(),
            Vec::new(),
        )
    }

    fn assemble(
        name: SmolStr,
        stages: Vec<Arc<Transducer>>,
        alphabet: Alphabet,
        weighting: Arc<dyn Weighting>,
        classes: ClassTable,
        subcascades: Vec<(SmolStr, Vec<usize>)>,
    ) -> Cascade {
        let inverted = stages.iter().map(|t| Arc::new(t.inverted())).collect();
        Cascade {
            name,
            stages,
            inverted,
            weighting,
            alphabet: Arc::new(alphabet),
            classes,
            subcascades,
            initial_weight: None,
        }
    }

    /// The cascade made of the stages listed by `cascade name = {...}`.
    pub fn subcascade(&self, name: &str) -> Option<Cascade> {
        let (_, indices) = self.subcascades.iter().find(|(n, _)| n == name)?;
        let pick = |stages: &[Arc<Transducer>]| -> Vec<Arc<Transducer>> {
            indices.iter().map(|&i| Arc::clone(&stages[i])).collect()
        };
        Some(Cascade {
            name: SmolStr::new(format!("{}.{name}", self.name)),
            stages: pick(&self.stages),
            inverted: pick(&self.inverted),
            weighting: Arc::clone(&self.weighting),
            alphabet: Arc::clone(&self.alphabet),
            classes: self.classes.clone(),
            subcascades: Vec::new(),
            initial_weight: self.initial_weight.clone(),
        })
    }

    /// Start every analysis path from `weight` instead of the identity.
    pub fn with_initial_weight(mut self, weight: Weight) -> Self {
        self.initial_weight = Some(weight);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[Arc<Transducer>] {
        &self.stages
    }

    pub(crate) fn inverted_stages(&self) -> &[Arc<Transducer>] {
        &self.inverted
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|t| t.name()).collect()
    }

    pub fn subcascade_names(&self) -> impl Iterator<Item = &str> {
        self.subcascades.iter().map(|(name, _)| name.as_str())
    }

    pub fn weighting(&self) -> &dyn Weighting {
        self.weighting.as_ref()
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn initial_weight(&self) -> Option<&Weight> {
        self.initial_weight.as_ref()
    }

    /// Split a word into this cascade's symbols.
    pub fn segment(&self, word: &str) -> Option<Vec<Symbol>> {
        self.alphabet.segment(word)
    }
}

fn read_required(source: &dyn RuleSource, file_name: &str) -> Result<String, CompileError> {
    match source.read(file_name) {
        Ok(Some(text)) => Ok(text),
        Ok(None) => Err(CompileError::Io {
            name: file_name.to_string(),
            source: io::Error::new(
                io::ErrorKind::NotFound,
                format!("not found in {}", source.describe()),
            ),
        }),
        Err(source) => Err(CompileError::Io {
            name: file_name.to_string(),
            source,
        }),
    }
}

fn flatten(err: CompileError) -> Vec<CompileError> {
    match err {
        CompileError::Multiple(errors) => errors.into_iter().flat_map(flatten).collect(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn source() -> MemorySource {
        MemorySource::new()
            .with(
                "toy.cas",
                "C = {b, c}\ncascade first = {0}\ncascade last = {1}\n>upper<\n>lower<\n",
            )
            .with("upper.fst", "s -> s [C;a]\ns -> s [x:a]\ns ->\n")
            .with("lower.fst", "s -> s [C;a]\ns ->\n")
    }

    #[test]
    fn compiles_stages_in_order() {
        let cascade = Cascade::compile(&source(), "toy").unwrap();
        assert_eq!(cascade.stage_names(), vec!["upper.fst", "lower.fst"]);
        assert_eq!(cascade.weighting().name(), "UNIFICATION");
        assert!(cascade.alphabet().get("x").is_some());
        assert!(cascade.classes().contains("C"));
    }

    #[test]
    fn subcascades_select_stages() {
        let cascade = Cascade::compile(&source(), "toy").unwrap();
        let names: Vec<&str> = cascade.subcascade_names().collect();
        assert_eq!(names, vec!["first", "last"]);
        let last = cascade.subcascade("last").unwrap();
        assert_eq!(last.stage_names(), vec!["lower.fst"]);
        assert!(cascade.subcascade("middle").is_none());
    }

    #[test]
    fn missing_cascade_file() {
        let err = Cascade::compile(&source(), "nope").unwrap_err();
        match err {
            CompileError::Io { source, .. } => assert_eq!(source.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_stage_file() {
        let src = source().with("bad.cas", ">upper<\n>ghost<\n");
        let err = Cascade::compile(&src, "bad").unwrap_err();
        assert!(matches!(err, CompileError::UndeclaredStage { ref name, .. } if name == "ghost"));
    }

    #[test]
    fn unknown_weighting() {
        let src = source().with("w.cas", "weighting = LOGPROB\n>upper<\n");
        let err = Cascade::compile(&src, "w").unwrap_err();
        assert!(matches!(err, CompileError::UnknownWeightMode { ref mode, .. } if mode == "LOGPROB"));
    }

    #[test]
    fn errors_from_all_stages_are_reported() {
        let src = MemorySource::new()
            .with("e.cas", ">one<\n>two<\n")
            .with("one.fst", "s -> e [Z-a]\ne ->\n")
            .with("two.fst", "s -> e [a]\n");
        let err = Cascade::compile(&src, "e").unwrap_err();
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn subcascade_index_out_of_range() {
        let src = source().with("s.cas", "cascade x = {3}\n>upper<\n");
        let err = Cascade::compile(&src, "s").unwrap_err();
        assert!(err.to_string().contains("refers to stage 3"));
    }

    #[test]
    fn repeated_stage_is_compiled_once() {
        let src = source().with("r.cas", ">upper<\n>upper<\n");
        let cascade = Cascade::compile(&src, "r").unwrap();
        assert!(Arc::ptr_eq(&cascade.stages()[0], &cascade.stages()[1]));
    }
}
