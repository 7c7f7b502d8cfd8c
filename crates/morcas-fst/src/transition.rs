// Arc and state records of a compiled transducer.

use crate::symbols::Symbol;
use crate::weighting::Weight;

/// Index of a state within its transducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub u32);

impl StateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One arc. The source state is implied by the arc's slot in the arena.
///
/// `weight` is `None` for arcs without an annotation; those behave as the
/// weighting's identity and cost nothing to combine.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub input: Symbol,
    pub output: Symbol,
    pub target: StateId,
    pub weight: Option<Weight>,
}

impl Transition {
    #[inline]
    pub fn is_epsilon_input(&self) -> bool {
        self.input.is_epsilon()
    }

    /// Same arc read in the opposite direction.
    pub fn inverted(&self) -> Transition {
        Transition {
            input: self.output,
            output: self.input,
            target: self.target,
            weight: self.weight.clone(),
        }
    }
}

/// A state: its name, whether it is final, and the slice of the arc arena
/// holding its outgoing arcs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub name: smol_str::SmolStr,
    pub is_final: bool,
    pub(crate) first: u32,
    pub(crate) count: u32,
}

impl State {
    #[inline]
    pub(crate) fn arc_range(&self) -> std::ops::Range<usize> {
        let first = self.first as usize;
        first..first + self.count as usize
    }
}
