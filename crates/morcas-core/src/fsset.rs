// Sets of alternative feature structures.
//
// An FsSet is a disjunction: a path weighted with `{a, b}` is consistent
// with either `a` or `b`. Unifying two sets unifies every pair and keeps
// the pairs that succeed; an empty result means the path is dead.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::features::{FeatureParseError, FeatureStructure};

/// A non-empty-by-convention set of alternative feature structures.
///
/// The set containing only the empty structure (see [`FsSet::top`]) is the
/// identity for unification. The empty set is the failure value and is
/// never produced by [`FsSet::unify`], which returns `None` instead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FsSet {
    members: BTreeSet<FeatureStructure>,
}

impl FsSet {
    /// The set `{[]}`, which unifies with anything.
    pub fn top() -> Self {
        Self::single(FeatureStructure::new())
    }

    pub fn single(fs: FeatureStructure) -> Self {
        let mut members = BTreeSet::new();
        members.insert(fs);
        Self { members }
    }

    /// Build a set from alternatives. Returns `None` if there are none.
    pub fn from_alternatives(alternatives: impl IntoIterator<Item = FeatureStructure>) -> Option<Self> {
        let members: BTreeSet<_> = alternatives.into_iter().collect();
        if members.is_empty() {
            None
        } else {
            Some(Self { members })
        }
    }

    pub fn is_top(&self) -> bool {
        self.members.len() == 1 && self.members.iter().all(FeatureStructure::is_empty)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureStructure> {
        self.members.iter()
    }

    /// Pairwise unification; `None` if no pair unifies.
    pub fn unify(&self, other: &FsSet) -> Option<FsSet> {
        if other.is_top() {
            return Some(self.clone());
        }
        if self.is_top() {
            return Some(other.clone());
        }
        let members: BTreeSet<FeatureStructure> = self
            .members
            .iter()
            .flat_map(|a| other.members.iter().filter_map(move |b| a.unify(b)))
            .collect();
        Self::from_alternatives(members)
    }

    /// Set union, used to merge paths that end in the same output.
    pub fn union(&self, other: &FsSet) -> FsSet {
        let mut members = self.members.clone();
        members.extend(other.members.iter().cloned());
        FsSet { members }
    }
}

impl From<FeatureStructure> for FsSet {
    fn from(fs: FeatureStructure) -> Self {
        FsSet::single(fs)
    }
}

impl IntoIterator for FsSet {
    type Item = FeatureStructure;
    type IntoIter = std::collections::btree_set::IntoIter<FeatureStructure>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

impl FromStr for FsSet {
    type Err = FeatureParseError;

    /// Parse `[...]` notation, expanding `|`, `+-` and top-level `;`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let alternatives = FeatureStructure::parse_alternatives(s)?;
        Ok(Self::from_alternatives(alternatives).unwrap_or_else(FsSet::top))
    }
}

impl fmt::Display for FsSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, fs) in self.members.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{fs}")?;
        }
        Ok(())
    }
}
