// Alphabet: symbol interning and word segmentation.
//
// Every symbol used by any stage of a cascade is interned once into a
// dense integer id. Index 0 is epsilon (the empty string). Multi-character
// symbols such as `bW` are ordinary entries; input words are segmented by
// greedy longest match against the known symbols.

use hashbrown::HashMap;
use smol_str::SmolStr;

/// An interned symbol. Compared and hashed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    pub const EPSILON: Symbol = Symbol(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_epsilon(self) -> bool {
        self.0 == 0
    }
}

/// Symbol table shared by every stage of a cascade.
///
/// Built while compiling and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Alphabet {
    /// Maps symbol index to its string representation.
    strings: Vec<SmolStr>,
    /// Maps a symbol string to its index.
    index: HashMap<SmolStr, Symbol>,
    /// Length in chars of the longest symbol.
    max_chars: usize,
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::new()
    }
}

impl Alphabet {
    pub fn new() -> Self {
        let mut index = HashMap::new();
        index.insert(SmolStr::default(), Symbol::EPSILON);
        Self {
            strings: vec![SmolStr::default()],
            index,
            max_chars: 0,
        }
    }

    /// Intern a symbol, returning its id. The empty string is epsilon.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&sym) = self.index.get(name) {
            return sym;
        }
        let sym = Symbol(self.strings.len() as u32);
        let name = SmolStr::new(name);
        self.max_chars = self.max_chars.max(name.chars().count());
        self.strings.push(name.clone());
        self.index.insert(name, sym);
        sym
    }

    /// Look up an already interned symbol.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.index.get(name).copied()
    }

    /// String form of a symbol.
    pub fn name(&self, sym: Symbol) -> &str {
        self.strings.get(sym.index()).map_or("", SmolStr::as_str)
    }

    /// Number of symbols, epsilon included.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }

    /// Split a word into symbols by greedy longest match.
    ///
    /// Returns `None` if some part of the word is not a known symbol; such a
    /// word cannot be transduced.
    pub fn segment(&self, word: &str) -> Option<Vec<Symbol>> {
        let bounds: Vec<usize> = word
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(word.len()))
            .collect();
        let char_count = bounds.len() - 1;
        let mut symbols = Vec::with_capacity(char_count);
        let mut pos = 0;
        'outer: while pos < char_count {
            let longest = self.max_chars.min(char_count - pos);
            for len in (1..=longest).rev() {
                let piece = &word[bounds[pos]..bounds[pos + len]];
                if let Some(sym) = self.get(piece) {
                    symbols.push(sym);
                    pos += len;
                    continue 'outer;
                }
            }
            return None;
        }
        Some(symbols)
    }

    /// Concatenate the string forms of symbols.
    pub fn render(&self, symbols: &[Symbol]) -> String {
        symbols.iter().map(|&s| self.name(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alphabet(symbols: &[&str]) -> Alphabet {
        let mut a = Alphabet::new();
        for s in symbols {
            a.intern(s);
        }
        a
    }

    #[test]
    fn epsilon_is_index_zero() {
        let mut a = Alphabet::new();
        assert_eq!(a.intern(""), Symbol::EPSILON);
        assert!(Symbol::EPSILON.is_epsilon());
        assert_eq!(a.name(Symbol::EPSILON), "");
        assert!(a.is_empty());
    }

    #[test]
    fn interning_is_stable() {
        let mut a = Alphabet::new();
        let b = a.intern("b");
        let bw = a.intern("bW");
        assert_ne!(b, bw);
        assert_eq!(a.intern("b"), b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.get("bW"), Some(bw));
        assert_eq!(a.get("x"), None);
    }

    #[test]
    fn segment_prefers_longest_symbol() {
        let a = alphabet(&["b", "bW", "a", "|", "W"]);
        let syms = a.segment("bWa|b").unwrap();
        let names: Vec<&str> = syms.iter().map(|&s| a.name(s)).collect();
        assert_eq!(names, vec!["bW", "a", "|", "b"]);
    }

    #[test]
    fn segment_unknown_material_fails() {
        let a = alphabet(&["b", "a"]);
        assert!(a.segment("bax").is_none());
        assert_eq!(a.segment("").unwrap(), Vec::new());
    }

    #[test]
    fn segment_multibyte() {
        let a = alphabet(&["ä", "ö", "ts'"]);
        let syms = a.segment("äts'ö").unwrap();
        assert_eq!(a.render(&syms), "äts'ö");
        assert_eq!(syms.len(), 3);
    }
}
