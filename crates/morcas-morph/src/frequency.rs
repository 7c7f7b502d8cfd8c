// Frequency tables for ranking.
//
// Keys are lexical outputs as rendered by the cascade (e.g. `s|b|r`).

use std::collections::BTreeMap;
use std::path::Path;

use hashbrown::HashMap;
use morcas_fst::{FrequencyTable, Weight};

use crate::MorphError;

/// Counts keyed by lexical output, built in memory.
#[derive(Debug, Clone, Default)]
pub struct MapFrequencies {
    counts: HashMap<String, f64>,
}

impl MapFrequencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, output: &str, count: f64) {
        self.counts.insert(output.to_string(), count);
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<(String, f64)> for MapFrequencies {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

impl FrequencyTable for MapFrequencies {
    fn frequency(&self, output: &str, _weight: &Weight) -> Option<f64> {
        self.counts.get(output).copied()
    }
}

/// Counts loaded from a JSON object mapping outputs to numbers:
///
/// ```json
/// { "s|b|r": 120, "b|c": 4 }
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonFrequencies {
    table: MapFrequencies,
}

impl JsonFrequencies {
    pub fn from_json(text: &str) -> Result<Self, MorphError> {
        let counts: BTreeMap<String, f64> = serde_json::from_str(text)?;
        Ok(Self {
            table: counts.into_iter().collect(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MorphError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MorphError::FrequencyIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl FrequencyTable for JsonFrequencies {
    fn frequency(&self, output: &str, weight: &Weight) -> Option<f64> {
        self.table.frequency(output, weight)
    }
}
