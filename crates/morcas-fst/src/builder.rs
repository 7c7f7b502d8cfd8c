// Grammar to transducer.
//
// Class declarations are evaluated in file order against a copy of the
// cascade's classes, so a `.fst` file sees the cascade's classes plus its
// own earlier declarations. All semantic errors of a file are collected and
// returned together.

use std::collections::BTreeSet;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use log::debug;
use smol_str::SmolStr;

use crate::classes::{ClassTable, StringSet};
use crate::grammar::{FstGrammar, FstItem, LabelSpec, Pattern, Rule};
use crate::symbols::{Alphabet, Symbol};
use crate::transducer::Transducer;
use crate::transition::{StateId, Transition};
use crate::weighting::{Weight, Weighting};
use crate::{CompileError, SourceLocation};

/// Resolved side of a label.
enum Side {
    Epsilon,
    Symbol(SmolStr),
    Set(StringSet),
}

impl Side {
    fn members(&self) -> Vec<&str> {
        match self {
            Side::Epsilon => vec![""],
            Side::Symbol(s) => vec![s.as_str()],
            Side::Set(set) => set.iter().map(SmolStr::as_str).collect(),
        }
    }
}

struct Builder<'a> {
    grammar: &'a FstGrammar,
    classes: ClassTable,
    alphabet: &'a mut Alphabet,
    weighting: &'a dyn Weighting,
    state_index: HashMap<SmolStr, StateId>,
    states: Vec<(SmolStr, bool)>,
    arcs: Vec<Vec<Transition>>,
    seen: HashSet<(StateId, Symbol, Symbol, StateId, Option<String>)>,
    start: Option<StateId>,
    declares_start: bool,
    errors: Vec<CompileError>,
}

/// Compile one `.fst` grammar.
///
/// `shared` holds the classes declared by the enclosing cascade. New symbols
/// are interned into `alphabet`; arc weights are parsed by `weighting`.
pub fn build_transducer(
    grammar: &FstGrammar,
    shared: &ClassTable,
    alphabet: &mut Alphabet,
    weighting: &dyn Weighting,
) -> Result<Transducer, CompileError> {
    let builder = Builder {
        grammar,
        classes: shared.clone(),
        alphabet,
        weighting,
        state_index: HashMap::new(),
        states: Vec::new(),
        arcs: Vec::new(),
        seen: HashSet::new(),
        start: None,
        declares_start: grammar
            .items
            .iter()
            .any(|item| matches!(item, FstItem::Start { .. })),
        errors: Vec::new(),
    };
    builder.build()
}

impl Builder<'_> {
    fn location(&self, line: usize) -> SourceLocation {
        SourceLocation::new(self.grammar.name.clone(), line)
    }

    fn malformed(&self, line: usize, message: impl Into<String>) -> CompileError {
        CompileError::MalformedAutomaton {
            location: self.location(line),
            fst: self.grammar.name.clone(),
            message: message.into(),
        }
    }

    fn state(&mut self, name: &SmolStr) -> StateId {
        if let Some(&id) = self.state_index.get(name) {
            return id;
        }
        let id = StateId(self.states.len() as u32);
        self.states.push((name.clone(), false));
        self.arcs.push(Vec::new());
        self.state_index.insert(name.clone(), id);
        id
    }

    fn build(mut self) -> Result<Transducer, CompileError> {
        let grammar = self.grammar;
        for item in &grammar.items {
            match item {
                FstItem::Class(decl) => {
                    if let Err(err) = self.classes.define_expr(&decl.name, &decl.expr) {
                        let location = self.location(decl.line);
                        self.errors.push(CompileError::UndefinedClass {
                            location,
                            name: err.0,
                        });
                    }
                }
                FstItem::Start { name, line } => {
                    let id = self.state(name);
                    match self.start {
                        Some(prev) if prev != id => {
                            let message = format!("start state declared twice (`{name}`)");
                            let err = CompileError::syntax(self.location(*line), message);
                            self.errors.push(err);
                        }
                        _ => self.start = Some(id),
                    }
                }
                FstItem::Rule(rule) => self.add_rule(rule),
            }
        }

        let first_line = grammar.rules().next().map_or(1, |r| r.line);
        if self.states.iter().all(|(_, is_final)| !is_final) {
            let err = self.malformed(first_line, "transducer has no final state");
            self.errors.push(err);
        }
        if !self.errors.is_empty() {
            return Err(CompileError::from_many(self.errors));
        }

        let transducer = Transducer::from_parts(
            grammar.name.clone(),
            self.start.unwrap_or(StateId(0)),
            self.states,
            self.arcs,
        );
        debug!(
            "built transducer {}: {} states, {} arcs",
            transducer.name(),
            transducer.state_count(),
            transducer.transition_count()
        );
        Ok(transducer)
    }

    fn add_rule(&mut self, rule: &Rule) {
        let source = self.state(&rule.source);
        if self.start.is_none() && !self.declares_start {
            self.start = Some(source);
        }
        let Some(target_name) = &rule.target else {
            self.states[source.index()].1 = true;
            return;
        };
        let target = self.state(target_name);

        let weight = match &rule.weight {
            None => None,
            Some(text) => match self.weighting.parse(text) {
                Ok(weight) => Some(weight),
                Err(err) => {
                    let err = CompileError::syntax(self.location(rule.line), err.to_string());
                    self.errors.push(err);
                    return;
                }
            },
        };

        for label in &rule.labels {
            match self.expand(label) {
                Ok(pairs) => {
                    for (input, output) in pairs {
                        self.push_arc(source, input, output, target, &weight, &rule.weight);
                    }
                }
                Err(message) => {
                    let err = self.malformed(rule.line, message);
                    self.errors.push(err);
                }
            }
        }
    }

    fn push_arc(
        &mut self,
        source: StateId,
        input: Symbol,
        output: Symbol,
        target: StateId,
        weight: &Option<Weight>,
        weight_text: &Option<String>,
    ) {
        let key = (source, input, output, target, weight_text.clone());
        if self.seen.insert(key) {
            self.arcs[source.index()].push(Transition {
                input,
                output,
                target,
                weight: weight.clone(),
            });
        }
    }

    fn resolve(&self, pattern: &Pattern) -> Result<Side, String> {
        match pattern {
            Pattern::Epsilon => Ok(Side::Epsilon),
            Pattern::Name(name) => match self.classes.resolve(name) {
                Ok(set) => Ok(Side::Set(Arc::clone(set))),
                Err(_) => Ok(Side::Symbol(name.clone())),
            },
            Pattern::Class(expr) => self
                .classes
                .evaluate(expr)
                .map(|set: BTreeSet<SmolStr>| Side::Set(Arc::new(set)))
                .map_err(|err| format!("label refers to {err}")),
        }
    }

    /// Every (input, output) symbol pair a label denotes.
    fn expand(&mut self, label: &LabelSpec) -> Result<Vec<(Symbol, Symbol)>, String> {
        let input = self.resolve(&label.input)?;
        let pairs: Vec<(String, String)> = match &label.output {
            // `X` and `X:X` are identities on the members of X
            None => identity(&input),
            Some(out) if *out == label.input && matches!(input, Side::Set(_)) => identity(&input),
            Some(out) => {
                let output = self.resolve(out)?;
                let outputs = output.members();
                input
                    .members()
                    .into_iter()
                    .flat_map(|i| outputs.iter().map(move |o| (i.to_string(), o.to_string())))
                    .collect()
            }
        };
        Ok(pairs
            .into_iter()
            .map(|(i, o)| (self.alphabet.intern(&i), self.alphabet.intern(&o)))
            .collect())
    }
}

fn identity(side: &Side) -> Vec<(String, String)> {
    side.members()
        .into_iter()
        .map(|m| (m.to_string(), m.to_string()))
        .collect()
}
