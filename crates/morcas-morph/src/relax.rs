// Relaxation policy for guessed generation.
//
// When a request generates nothing, attributes are dropped one at a time,
// cumulatively, and generation is retried after each drop:
//
//   1. the attributes listed in `optional`, in that order, when present;
//   2. the remaining top-level attributes in reverse name order.
//
// `pos` is never dropped since it selects the cascade.

use morcas_core::{ATTR_POS, FeatureStructure};
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relaxation {
    /// Attributes to give up first, most expendable first.
    pub optional: Vec<SmolStr>,
    /// Stop after dropping this many attributes. `None` drops all but `pos`.
    pub max_dropped: Option<usize>,
}

impl Default for Relaxation {
    fn default() -> Self {
        Self {
            optional: Vec::new(),
            max_dropped: Some(3),
        }
    }
}

impl Relaxation {
    pub fn new(optional: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            optional: optional.into_iter().map(SmolStr::new_static).collect(),
            ..Self::default()
        }
    }

    pub fn with_max_dropped(mut self, limit: Option<usize>) -> Self {
        self.max_dropped = limit;
        self
    }

    /// Attributes of `request` in the order they are dropped.
    pub fn drop_order(&self, request: &FeatureStructure) -> Vec<SmolStr> {
        let mut order: Vec<SmolStr> = self
            .optional
            .iter()
            .filter(|name| name.as_str() != ATTR_POS && request.contains(name))
            .cloned()
            .collect();
        let mut rest: Vec<SmolStr> = request
            .names()
            .filter(|name| *name != ATTR_POS && !order.iter().any(|o| o == name))
            .map(SmolStr::new)
            .collect();
        rest.reverse();
        order.extend(rest);
        if let Some(limit) = self.max_dropped {
            order.truncate(limit);
        }
        order
    }

    /// Successively relaxed requests, excluding `request` itself.
    pub fn steps(&self, request: &FeatureStructure) -> Vec<FeatureStructure> {
        let mut current = request.clone();
        self.drop_order(request)
            .into_iter()
            .map(|name| {
                current.remove(&name);
                current.clone()
            })
            .collect()
    }
}
