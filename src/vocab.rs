use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Context as _;
use rand::Rng;

use crate::error::{SynthError, SynthResult};

/// External key -> character table (the "general vocabulary" dictionary).
///
/// Loaded from a JSON object of string keys to string values. Only the value
/// set feeds the sampling alphabet; the keys matter to the atlas builder,
/// whose glyph files are named `<key>.svg`.
#[derive(Clone, Debug, Default)]
pub struct Dictionary {
    by_key: BTreeMap<String, char>,
}

impl Dictionary {
    pub fn load(path: &Path) -> SynthResult<Self> {
        let f = std::fs::File::open(path)
            .with_context(|| format!("open dictionary '{}'", path.display()))?;
        let raw: BTreeMap<String, String> =
            serde_json::from_reader(std::io::BufReader::new(f)).context("parse dictionary JSON")?;
        Ok(Self::from_entries(raw))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut by_key = BTreeMap::new();
        for (key, value) in entries {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => {
                    by_key.insert(key, ch);
                }
                _ => {
                    tracing::warn!(key = %key, "dictionary value is not a single character; skipped");
                }
            }
        }
        Self { by_key }
    }

    pub fn char_for_key(&self, key: &str) -> Option<char> {
        self.by_key.get(key).copied()
    }

    pub fn values(&self) -> BTreeSet<char> {
        self.by_key.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// The sampling alphabet: glyph-source coverage ∩ dictionary values.
///
/// Always sorted and deduplicated, so resolving identical inputs twice yields
/// an identical alphabet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    chars: Vec<char>,
}

impl Vocabulary {
    pub fn resolve(coverage: &BTreeSet<char>, dictionary: &Dictionary) -> SynthResult<Self> {
        let values = dictionary.values();
        let chars: Vec<char> = coverage.intersection(&values).copied().collect();
        if chars.is_empty() {
            return Err(SynthError::setup(
                "vocabulary intersection is empty: the glyph source covers no dictionary character",
            ));
        }
        Ok(Self { chars })
    }

    /// Second intersection step for the atlas backend: keep only characters
    /// that also survived atlas construction.
    pub fn restrict_to(&self, kept: &BTreeSet<char>) -> SynthResult<Self> {
        let chars: Vec<char> = self.chars.iter().copied().filter(|c| kept.contains(c)).collect();
        if chars.is_empty() {
            return Err(SynthError::setup(
                "vocabulary is empty after atlas intersection: no dictionary character has an atlas entry",
            ));
        }
        Ok(Self { chars })
    }

    pub fn contains(&self, ch: char) -> bool {
        self.chars.binary_search(&ch).is_ok()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Uniform draw with replacement.
    pub fn sample(&self, rng: &mut impl Rng) -> char {
        self.chars[rng.gen_range(0..self.chars.len())]
    }
}
