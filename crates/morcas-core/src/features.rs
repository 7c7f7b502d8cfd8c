// Feature structures and unification.
//
// A feature structure is a partial map from attribute names to values. A
// value is a boolean flag (`+x` / `-x`), an atom (`x=v`) or a nested
// structure (`x=[...]`). Unspecified attributes are unconstrained, so the
// empty structure `[]` unifies with everything.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

/// Attribute conventionally holding the part of speech.
pub const ATTR_POS: &str = "pos";

/// Error raised when feature notation cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeatureParseError {
    #[error("expected `{expected}` at offset {offset} in {input:?}")]
    Expected {
        expected: char,
        offset: usize,
        input: String,
    },
    #[error("missing feature name at offset {offset} in {input:?}")]
    MissingName { offset: usize, input: String },
    #[error("empty value for feature `{name}` in {input:?}")]
    EmptyValue { name: String, input: String },
    #[error("feature `{name}` given twice in {input:?}")]
    Duplicate { name: String, input: String },
    #[error("unexpected trailing input at offset {offset} in {input:?}")]
    Trailing { offset: usize, input: String },
    #[error("{input:?} describes alternatives where a single structure is required")]
    Disjunction { input: String },
}

/// A feature value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// `+name` (true) or `-name` (false).
    Flag(bool),
    /// `name=atom`.
    Atom(SmolStr),
    /// `name=[...]`.
    Nested(FeatureStructure),
}

impl Value {
    /// Unify two values. `None` means the values are incompatible.
    ///
    /// Flags unify only with flags of the same polarity, atoms only with
    /// equal atoms, nested structures recursively. Mixed kinds never unify.
    pub fn unify(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Flag(a), Value::Flag(b)) if a == b => Some(self.clone()),
            (Value::Atom(a), Value::Atom(b)) if a == b => Some(self.clone()),
            (Value::Nested(a), Value::Nested(b)) => a.unify(b).map(Value::Nested),
            _ => None,
        }
    }

    /// Return the atom text, if this is an atom.
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Value::Atom(a) => Some(a.as_str()),
            _ => None,
        }
    }

    /// Return the flag polarity, if this is a flag.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Return the nested structure, if any.
    pub fn as_nested(&self) -> Option<&FeatureStructure> {
        match self {
            Value::Nested(fs) => Some(fs),
            _ => None,
        }
    }

    fn specificity(&self) -> usize {
        match self {
            Value::Flag(_) | Value::Atom(_) => 1,
            Value::Nested(fs) => fs.specificity(),
        }
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Flag(flag)
    }
}

impl From<&str> for Value {
    fn from(atom: &str) -> Self {
        Value::Atom(SmolStr::new(atom))
    }
}

impl From<FeatureStructure> for Value {
    fn from(fs: FeatureStructure) -> Self {
        Value::Nested(fs)
    }
}

/// A partial feature structure.
///
/// Attributes are kept in name order, so equality, hashing and display do
/// not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FeatureStructure {
    features: BTreeMap<SmolStr, Value>,
}

impl FeatureStructure {
    /// Create the empty (top) structure, which unifies with anything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set an attribute, replacing any previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.features.insert(SmolStr::new(name), value.into());
    }

    /// Look up an attribute.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.features.get(name)
    }

    /// Look up an attribute through nested structures, e.g. `["sb", "p1"]`.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let value = self.features.get(*first)?;
        if rest.is_empty() {
            Some(value)
        } else {
            value.as_nested()?.get_path(rest)
        }
    }

    /// Remove an attribute, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.features.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    /// Iterate over attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.features.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Attribute names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(SmolStr::as_str)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Unify two structures.
    ///
    /// Attributes present on one side only are copied; attributes present on
    /// both sides are unified recursively. Returns `None` when any shared
    /// attribute has incompatible values.
    pub fn unify(&self, other: &FeatureStructure) -> Option<FeatureStructure> {
        if other.is_empty() {
            return Some(self.clone());
        }
        if self.is_empty() {
            return Some(other.clone());
        }
        let mut merged = self.features.clone();
        for (name, value) in &other.features {
            match merged.get_mut(name) {
                Some(existing) => *existing = existing.unify(value)?,
                None => {
                    merged.insert(name.clone(), value.clone());
                }
            }
        }
        Some(FeatureStructure { features: merged })
    }

    /// Whether `self` is at least as general as `other`: everything `self`
    /// specifies is also specified, compatibly, by `other`.
    pub fn subsumes(&self, other: &FeatureStructure) -> bool {
        self.features.iter().all(|(name, value)| match other.features.get(name) {
            None => false,
            Some(theirs) => match (value, theirs) {
                (Value::Nested(a), Value::Nested(b)) => a.subsumes(b),
                _ => value == theirs,
            },
        })
    }

    /// Number of specified leaf values (flags and atoms), counting through
    /// nested structures.
    pub fn specificity(&self) -> usize {
        self.features.values().map(Value::specificity).sum()
    }

    /// Parse notation that may contain alternatives (`|`, `+-`, `;`) and
    /// return every alternative it expands to.
    pub fn parse_alternatives(input: &str) -> Result<Vec<FeatureStructure>, FeatureParseError> {
        let mut alternatives = Vec::new();
        for part in split_top_level(input) {
            let mut parser = NotationParser::new(part.trim(), input);
            let parsed = parser.structure()?;
            parser.finish()?;
            for fs in parsed {
                if !alternatives.contains(&fs) {
                    alternatives.push(fs);
                }
            }
        }
        Ok(alternatives)
    }
}

impl FromStr for FeatureStructure {
    type Err = FeatureParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut alternatives = FeatureStructure::parse_alternatives(s)?;
        if alternatives.len() != 1 {
            return Err(FeatureParseError::Disjunction {
                input: s.to_string(),
            });
        }
        Ok(alternatives.remove(0))
    }
}

impl fmt::Display for FeatureStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (name, value)) in self.features.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match value {
                Value::Flag(true) => write!(f, "+{name}")?,
                Value::Flag(false) => write!(f, "-{name}")?,
                Value::Atom(atom) => write!(f, "{name}={atom}")?,
                Value::Nested(fs) => write!(f, "{name}={fs}")?,
            }
        }
        f.write_str("]")
    }
}

/// Split on `;` outside brackets.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Recursive-descent parser over `[...]` notation, expanding alternatives
/// as it goes.
struct NotationParser<'a> {
    chars: Vec<(usize, char)>,
    pos: usize,
    len: usize,
    whole: &'a str,
}

impl<'a> NotationParser<'a> {
    fn new(part: &str, whole: &'a str) -> Self {
        let chars: Vec<(usize, char)> = part.char_indices().collect();
        Self {
            len: part.len(),
            chars,
            pos: 0,
            whole,
        }
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.len, |&(o, _)| o)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), FeatureParseError> {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(FeatureParseError::Expected {
                expected,
                offset: self.offset(),
                input: self.whole.to_string(),
            })
        }
    }

    fn finish(&mut self) -> Result<(), FeatureParseError> {
        self.skip_ws();
        if self.pos < self.chars.len() {
            return Err(FeatureParseError::Trailing {
                offset: self.offset(),
                input: self.whole.to_string(),
            });
        }
        Ok(())
    }

    fn structure(&mut self) -> Result<Vec<FeatureStructure>, FeatureParseError> {
        self.expect('[')?;
        self.skip_ws();
        let mut alternatives = vec![FeatureStructure::new()];
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(alternatives);
        }
        loop {
            let (name, values) = self.item()?;
            let mut expanded = Vec::with_capacity(alternatives.len() * values.len());
            for fs in &alternatives {
                if fs.contains(&name) {
                    return Err(FeatureParseError::Duplicate {
                        name: name.to_string(),
                        input: self.whole.to_string(),
                    });
                }
                for value in &values {
                    let mut next = fs.clone();
                    next.features.insert(name.clone(), value.clone());
                    expanded.push(next);
                }
            }
            alternatives = expanded;
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(alternatives);
                }
                _ => {
                    return Err(FeatureParseError::Expected {
                        expected: ']',
                        offset: self.offset(),
                        input: self.whole.to_string(),
                    });
                }
            }
        }
    }

    fn name(&mut self) -> Result<SmolStr, FeatureParseError> {
        self.skip_ws();
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(FeatureParseError::MissingName {
                offset: self.offset(),
                input: self.whole.to_string(),
            });
        }
        Ok(self.chars[start..self.pos].iter().map(|&(_, c)| c).collect())
    }

    fn item(&mut self) -> Result<(SmolStr, Vec<Value>), FeatureParseError> {
        self.skip_ws();
        match self.peek() {
            Some('+') => {
                self.pos += 1;
                if self.peek() == Some('-') {
                    self.pos += 1;
                    let name = self.name()?;
                    Ok((name, vec![Value::Flag(true), Value::Flag(false)]))
                } else {
                    Ok((self.name()?, vec![Value::Flag(true)]))
                }
            }
            Some('-') => {
                self.pos += 1;
                Ok((self.name()?, vec![Value::Flag(false)]))
            }
            _ => {
                let name = self.name()?;
                self.expect('=')?;
                self.skip_ws();
                if self.peek() == Some('[') {
                    let nested = self.structure()?;
                    Ok((name, nested.into_iter().map(Value::Nested).collect()))
                } else {
                    let values = self.atoms(&name)?;
                    Ok((name, values))
                }
            }
        }
    }

    fn atoms(&mut self, name: &str) -> Result<Vec<Value>, FeatureParseError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| !matches!(c, ',' | ']' | '[')) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().map(|&(_, c)| c).collect();
        let mut values = Vec::new();
        for atom in text.split('|').map(str::trim) {
            if atom.is_empty() {
                return Err(FeatureParseError::EmptyValue {
                    name: name.to_string(),
                    input: self.whole.to_string(),
                });
            }
            let value = Value::Atom(SmolStr::new(atom));
            if !values.contains(&value) {
                values.push(value);
            }
        }
        Ok(values)
    }
}
