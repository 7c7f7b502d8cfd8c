// Compiled transducer.
//
// States live in a Vec addressed by `StateId`; all arcs live in a single
// arena, grouped by source state and sorted by input symbol within each
// group, so the arcs of a state reading a given symbol form one contiguous
// run found by binary search. Epsilon-input arcs sort first.

use smol_str::SmolStr;

use crate::symbols::Symbol;
use crate::transition::{State, StateId, Transition};

#[derive(Debug, Clone)]
pub struct Transducer {
    name: SmolStr,
    start: StateId,
    states: Vec<State>,
    arcs: Vec<Transition>,
}

impl Transducer {
    /// Assemble a transducer from per-state arc lists.
    ///
    /// `states[i]` is `(name, is_final)` and `arcs[i]` its outgoing arcs.
    pub(crate) fn from_parts(
        name: SmolStr,
        start: StateId,
        states: Vec<(SmolStr, bool)>,
        mut arcs: Vec<Vec<Transition>>,
    ) -> Self {
        arcs.resize_with(states.len(), Vec::new);
        let mut arena = Vec::with_capacity(arcs.iter().map(Vec::len).sum());
        let states = states
            .into_iter()
            .zip(arcs)
            .map(|((name, is_final), mut out)| {
                out.sort_by_key(|t| (t.input, t.output, t.target));
                let first = arena.len() as u32;
                let count = out.len() as u32;
                arena.extend(out);
                State {
                    name,
                    is_final,
                    first,
                    count,
                }
            })
            .collect();
        Self {
            name,
            start,
            states,
            arcs: arena,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.arcs.len()
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.states
            .iter()
            .position(|s| s.name == name)
            .map(|i| StateId(i as u32))
    }

    #[inline]
    pub fn is_final(&self, id: StateId) -> bool {
        self.states[id.index()].is_final
    }

    /// All outgoing arcs of a state, ordered by input symbol.
    #[inline]
    pub fn transitions(&self, id: StateId) -> &[Transition] {
        &self.arcs[self.states[id.index()].arc_range()]
    }

    /// Outgoing arcs reading exactly `input`.
    pub fn transitions_on(&self, id: StateId, input: Symbol) -> &[Transition] {
        let arcs = self.transitions(id);
        let lo = arcs.partition_point(|t| t.input < input);
        let hi = lo + arcs[lo..].partition_point(|t| t.input == input);
        &arcs[lo..hi]
    }

    /// Outgoing arcs that consume no input.
    #[inline]
    pub fn epsilon_transitions(&self, id: StateId) -> &[Transition] {
        let arcs = self.transitions(id);
        &arcs[..arcs.partition_point(Transition::is_epsilon_input)]
    }

    /// The same relation read output to input, used for generation.
    pub fn inverted(&self) -> Transducer {
        let states = self
            .states
            .iter()
            .map(|s| (s.name.clone(), s.is_final))
            .collect();
        let arcs = self
            .states
            .iter()
            .map(|s| self.arcs[s.arc_range()].iter().map(Transition::inverted).collect())
            .collect();
        Transducer::from_parts(self.name.clone(), self.start, states, arcs)
    }
}
