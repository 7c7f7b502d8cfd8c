// Where rule files come from.

use std::io;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;

/// Provider of `.cas` and `.fst` texts by file name.
pub trait RuleSource {
    /// Read `file_name` (e.g. `"am.cas"`, `"epen1.fst"`).
    ///
    /// Returns `Ok(None)` when the file does not exist; other failures are
    /// errors.
    fn read(&self, file_name: &str) -> io::Result<Option<String>>;

    /// Name used in diagnostics.
    fn describe(&self) -> String;
}

/// Rule files in a directory on disk.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RuleSource for DirSource {
    fn read(&self, file_name: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.root.join(file_name)) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Rule files held in memory, for tests and embedded grammars.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, file_name: &str, text: &str) -> Self {
        self.insert(file_name, text);
        self
    }

    pub fn insert(&mut self, file_name: &str, text: &str) {
        self.files.insert(file_name.to_string(), text.to_string());
    }
}

impl RuleSource for MemorySource {
    fn read(&self, file_name: &str) -> io::Result<Option<String>> {
        Ok(self.files.get(file_name).cloned())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_lookup() {
        let src = MemorySource::new().with("a.fst", "s -> e [a]\ne ->\n");
        assert!(src.read("a.fst").unwrap().is_some());
        assert!(src.read("b.fst").unwrap().is_none());
    }

    #[test]
    fn dir_source_missing_file_is_none() {
        let src = DirSource::new(std::env::temp_dir().join("morcas-no-such-dir"));
        assert!(src.read("x.cas").unwrap().is_none());
    }
}
