// Cascade traversal.
//
// A cascade is run stage by stage, depth first: every string a stage
// produces is carried through the remaining stages before the next one is
// looked at, so finished candidates accumulate even when the search budget
// runs out part way. Within a stage, the completions of the input from
// (state, position) are computed by depth-first search and memoized on
// (state, position); a completion is an output suffix with its accumulated
// weight, and suffixes with the same output are merged with the
// weighting's `add`. The result of running a stage on a given input under a
// given constraint is memoized for the whole query, so strings produced by
// several paths of the previous stage are transduced once.
//
// Epsilon cycles are cut when a (state, position) already on the current
// path comes round again. A result computed below such a cut is only valid
// for paths through the cut frame, so it is memoized only once that frame
// has returned.
//
// The constraint is the weight a string arrives with. A partial completion
// whose weight no longer combines with it is dropped immediately, which is
// what keeps unification cascades tractable.

use std::rc::Rc;

use hashbrown::HashMap;
use log::trace;
use morcas_core::FsSet;

use crate::cascade::Cascade;
use crate::config::{SearchBudget, SearchOptions};
use crate::symbols::Symbol;
use crate::transducer::Transducer;
use crate::transition::StateId;
use crate::weighting::{Weight, Weighting};

/// Which way a cascade is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Surface to lexical: stages in declared order, input side to output side.
    Analysis,
    /// Lexical to surface: stages in reverse order, each read output to input.
    Generation,
}

/// A complete path through every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub output: Vec<Symbol>,
    pub weight: Weight,
}

/// Outcome of one traversal.
#[derive(Debug, Clone, Default)]
pub struct Transduction {
    pub candidates: Vec<Candidate>,
    /// The budget ran out; `candidates` may be incomplete.
    pub exhausted: bool,
    pub explored: usize,
}

type Completions = Vec<(Vec<Symbol>, Weight)>;

/// Hashable form of a constraint, for the per-query stage memo.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstraintKey {
    Features(FsSet),
    Scalar(u64),
}

impl ConstraintKey {
    fn of(weight: &Weight) -> Self {
        match weight {
            Weight::Features(set) => ConstraintKey::Features(set.clone()),
            Weight::Scalar(value) => ConstraintKey::Scalar(value.to_bits()),
        }
    }
}

/// Insertion-ordered map from output to merged weight.
struct Merger<'w> {
    weighting: &'w dyn Weighting,
    items: Completions,
    index: HashMap<Vec<Symbol>, usize>,
}

impl<'w> Merger<'w> {
    fn new(weighting: &'w dyn Weighting) -> Self {
        Self {
            weighting,
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn push(&mut self, output: Vec<Symbol>, weight: Weight) {
        match self.index.get(&output) {
            Some(&i) => {
                let merged = self.weighting.add(&self.items[i].1, &weight);
                self.items[i].1 = merged;
            }
            None => {
                self.index.insert(output.clone(), self.items.len());
                self.items.push((output, weight));
            }
        }
    }

    fn into_vec(self) -> Completions {
        self.items
    }
}

/// One stage applied to one input string.
struct StageRun<'a> {
    fst: &'a Transducer,
    input: &'a [Symbol],
    constraint: &'a Weight,
    constrained: bool,
    weighting: &'a dyn Weighting,
    budget: &'a mut SearchBudget,
    memo: HashMap<(StateId, usize), Rc<Completions>>,
    /// Frames on the current path, with their depth.
    on_path: HashMap<(StateId, usize), usize>,
}

/// Depth of the shallowest open frame a result was cut against.
/// `usize::MAX` when the result depends on no open frame.
type CutDepth = usize;

const NO_CUT: CutDepth = usize::MAX;

impl<'a> StageRun<'a> {
    fn new(
        fst: &'a Transducer,
        input: &'a [Symbol],
        constraint: &'a Weight,
        weighting: &'a dyn Weighting,
        budget: &'a mut SearchBudget,
    ) -> Self {
        Self {
            fst,
            input,
            constraint,
            constrained: *constraint != weighting.one(),
            weighting,
            budget,
            memo: HashMap::new(),
            on_path: HashMap::new(),
        }
    }

    fn run(mut self) -> Rc<Completions> {
        self.completions(self.fst.start(), 0).0
    }

    fn completions(&mut self, state: StateId, pos: usize) -> (Rc<Completions>, CutDepth) {
        let key = (state, pos);
        if let Some(done) = self.memo.get(&key) {
            return (Rc::clone(done), NO_CUT);
        }
        // an epsilon cycle back to a (state, position) already on the path
        if let Some(&depth) = self.on_path.get(&key) {
            return (Rc::new(Vec::new()), depth);
        }
        let depth = self.on_path.len();
        self.on_path.insert(key, depth);

        let fst = self.fst;
        let input = self.input;
        let weighting = self.weighting;
        let mut merged = Merger::new(weighting);
        let mut cut = NO_CUT;

        if pos == input.len() && fst.is_final(state) {
            merged.push(Vec::new(), weighting.one());
        }

        let epsilon = fst.epsilon_transitions(state).iter().map(|t| (t, pos));
        let reading = input
            .get(pos)
            .map_or(&[][..], |&sym| fst.transitions_on(state, sym))
            .iter()
            .map(|t| (t, pos + 1));

        for (arc, next) in epsilon.chain(reading) {
            if !self.budget.tick() {
                break;
            }
            let (rest, rest_cut) = self.completions(arc.target, next);
            cut = cut.min(rest_cut);
            for (suffix, weight) in rest.iter() {
                let weight = match &arc.weight {
                    Some(own) => match weighting.combine(own, weight) {
                        Some(w) => w,
                        None => continue,
                    },
                    None => weight.clone(),
                };
                if self.constrained && weighting.combine(self.constraint, &weight).is_none() {
                    continue;
                }
                let mut output = Vec::with_capacity(suffix.len() + 1);
                if !arc.output.is_epsilon() {
                    output.push(arc.output);
                }
                output.extend_from_slice(suffix);
                merged.push(output, weight);
            }
        }

        self.on_path.remove(&key);
        let result = Rc::new(merged.into_vec());
        if cut >= depth {
            self.memo.insert(key, Rc::clone(&result));
            (result, NO_CUT)
        } else {
            (result, cut)
        }
    }
}

/// The stages of one query and what has been computed for them.
struct Pipeline<'a> {
    stages: Vec<&'a Transducer>,
    weighting: &'a dyn Weighting,
    budget: SearchBudget,
    memo: HashMap<(usize, Vec<Symbol>, ConstraintKey), Rc<Completions>>,
    finished: Merger<'a>,
}

impl<'a> Pipeline<'a> {
    /// Feed `string`, arriving with `weight`, through stage `index` and on
    /// through every later stage.
    fn descend(&mut self, index: usize, string: &[Symbol], weight: &Weight) {
        let Some(&fst) = self.stages.get(index) else {
            self.finished.push(string.to_vec(), weight.clone());
            return;
        };
        let key = (index, string.to_vec(), ConstraintKey::of(weight));
        let completions = match self.memo.get(&key) {
            Some(done) => Rc::clone(done),
            None => {
                let done = StageRun::new(fst, string, weight, self.weighting, &mut self.budget).run();
                trace!(
                    "stage {index} ({}): {} outputs",
                    fst.name(),
                    done.len()
                );
                self.memo.insert(key, Rc::clone(&done));
                done
            }
        };
        for (output, w) in completions.iter() {
            if let Some(total) = self.weighting.combine(weight, w) {
                self.descend(index + 1, output, &total);
            }
        }
    }
}

/// Run `input` through every stage of `cascade`.
///
/// `initial` is the weight every path starts from: the cascade's initial
/// weight for analysis, the feature request for generation.
pub fn transduce(
    cascade: &Cascade,
    input: &[Symbol],
    direction: Direction,
    initial: &Weight,
    options: &SearchOptions,
) -> Transduction {
    let weighting = cascade.weighting();
    let stages: Vec<&Transducer> = match direction {
        Direction::Analysis => cascade.stages().iter().map(|t| t.as_ref()).collect(),
        Direction::Generation => cascade
            .inverted_stages()
            .iter()
            .rev()
            .map(|t| t.as_ref())
            .collect(),
    };

    let mut pipeline = Pipeline {
        stages,
        weighting,
        budget: SearchBudget::new(options),
        memo: HashMap::new(),
        finished: Merger::new(weighting),
    };
    pipeline.descend(0, input, initial);
    trace!(
        "{}: {} candidates after {} arcs",
        cascade.name(),
        pipeline.finished.items.len(),
        pipeline.budget.explored()
    );

    Transduction {
        candidates: pipeline
            .finished
            .into_vec()
            .into_iter()
            .map(|(output, weight)| Candidate { output, weight })
            .collect(),
        exhausted: pipeline.budget.is_exhausted(),
        explored: pipeline.budget.explored(),
    }
}
