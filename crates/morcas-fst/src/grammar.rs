// Intermediate grammar produced by the parser.
//
// The parser only checks syntax. Class references, weights and stage names
// are resolved later by the builder and the cascade compiler, which report
// semantic errors against the line numbers kept here.

use smol_str::SmolStr;

/// A class expression, as written in a declaration or a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassExpr {
    /// `{a, b, c}`
    Enumerated(Vec<SmolStr>),
    /// `X`, either a class name or (on the right of `-`) a literal symbol.
    Named(SmolStr),
    /// `X - {a}`, `X-a,b`, `X-Y`
    Difference(Box<ClassExpr>, Box<ClassExpr>),
    /// `X&Y`
    Intersection(Box<ClassExpr>, Box<ClassExpr>),
}

/// One side of a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Empty side.
    Epsilon,
    /// A bare token: a class if one by that name is defined, else a symbol.
    Name(SmolStr),
    /// An explicit class expression (`X-b`, `X&Y`, `{a,b}`).
    Class(ClassExpr),
}

/// One `;`-separated component of a label list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpec {
    pub input: Pattern,
    /// `None` for identity labels written without `:`.
    pub output: Option<Pattern>,
}

impl LabelSpec {
    pub fn epsilon() -> Self {
        Self {
            input: Pattern::Epsilon,
            output: Some(Pattern::Epsilon),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: SmolStr,
    pub expr: ClassExpr,
    pub line: usize,
}

/// `source -> target [labels] [weight]`, or `source ->` for a final state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub source: SmolStr,
    pub target: Option<SmolStr>,
    pub labels: Vec<LabelSpec>,
    /// Raw weight text including its brackets; parsed by the weighting.
    pub weight: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FstItem {
    Class(ClassDecl),
    /// `-> name`
    Start { name: SmolStr, line: usize },
    Rule(Rule),
}

/// Grammar of one `.fst` file, items in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FstGrammar {
    pub name: SmolStr,
    pub items: Vec<FstItem>,
}

impl FstGrammar {
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.items.iter().filter_map(|item| match item {
            FstItem::Rule(rule) => Some(rule),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRef {
    pub name: SmolStr,
    pub line: usize,
}

/// `cascade name = {0, 2, 3}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcascadeDecl {
    pub name: SmolStr,
    pub indices: Vec<usize>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightingDecl {
    pub mode: String,
    pub line: usize,
}

/// Grammar of one `.cas` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeGrammar {
    pub name: SmolStr,
    pub weighting: Option<WeightingDecl>,
    pub classes: Vec<ClassDecl>,
    pub subcascades: Vec<SubcascadeDecl>,
    pub stages: Vec<StageRef>,
}
