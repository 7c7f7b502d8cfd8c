// Named string sets ("classes").
//
// Derived classes are materialized when they are defined, so redefining a
// class later does not change anything derived from it earlier.

use std::collections::BTreeSet;
use std::sync::Arc;

use hashbrown::HashMap;
use smol_str::SmolStr;

use crate::grammar::ClassExpr;

/// Immutable set of symbol strings.
pub type StringSet = Arc<BTreeSet<SmolStr>>;

/// A class name was used before it was defined.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("undefined class `{0}`")]
pub struct UndefinedClass(pub SmolStr);

#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    classes: HashMap<SmolStr, StringSet>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a class.
    pub fn define(&mut self, name: &str, members: impl IntoIterator<Item = SmolStr>) {
        self.classes
            .insert(SmolStr::new(name), Arc::new(members.into_iter().collect()));
    }

    /// Evaluate `expr` against the current table and register the result.
    pub fn define_expr(&mut self, name: &str, expr: &ClassExpr) -> Result<(), UndefinedClass> {
        let members = self.evaluate(expr)?;
        self.classes.insert(SmolStr::new(name), Arc::new(members));
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&StringSet, UndefinedClass> {
        self.classes
            .get(name)
            .ok_or_else(|| UndefinedClass(SmolStr::new(name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Evaluate a class expression to its member set.
    ///
    /// Names on the left of `-` or either side of `&` must be classes. On
    /// the right of `-` a name that is not a class stands for the symbol
    /// itself, so `X-b` removes the symbol `b`.
    pub fn evaluate(&self, expr: &ClassExpr) -> Result<BTreeSet<SmolStr>, UndefinedClass> {
        match expr {
            ClassExpr::Enumerated(members) => Ok(members.iter().cloned().collect()),
            ClassExpr::Named(name) => Ok(self.resolve(name)?.as_ref().clone()),
            ClassExpr::Difference(left, right) => {
                let left = self.evaluate(left)?;
                let right = self.evaluate_subtrahend(right)?;
                Ok(left.difference(&right).cloned().collect())
            }
            ClassExpr::Intersection(left, right) => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(left.intersection(&right).cloned().collect())
            }
        }
    }

    fn evaluate_subtrahend(&self, expr: &ClassExpr) -> Result<BTreeSet<SmolStr>, UndefinedClass> {
        match expr {
            ClassExpr::Named(name) if !self.contains(name) => {
                Ok(std::iter::once(name.clone()).collect())
            }
            other => self.evaluate(other),
        }
    }
}
