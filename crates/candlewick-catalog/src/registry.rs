//! Bundled pair registry.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::{CatalogError, Pair, PairCategory, SymbolCatalog, SymbolStatus};

/// The pair metadata JSON embedded at compile time.
const PAIRS_JSON: &str = include_str!("../data/pairs.json");

/// Global pair registry instance.
static REGISTRY: OnceLock<PairRegistry> = OnceLock::new();

/// Registry of tradable perpetual pairs, keyed by canonical symbol.
#[derive(Debug, Clone, Default)]
pub struct PairRegistry {
    pairs: HashMap<String, Pair>,
}

impl PairRegistry {
    /// Returns the global registry of bundled pairs.
    ///
    /// The registry is initialized lazily on first access.
    #[must_use]
    pub fn global() -> &'static Self {
        REGISTRY.get_or_init(|| {
            Self::from_json(PAIRS_JSON).unwrap_or_else(|err| {
                tracing::error!(error = %err, "bundled pair catalog is unreadable");
                Self::default()
            })
        })
    }

    /// Parses a registry from a JSON object keyed by symbol.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a key disagrees with the
    /// symbol of its entry.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let pairs: HashMap<String, Pair> = serde_json::from_str(json)?;
        if let Some((key, pair)) = pairs.iter().find(|(key, pair)| key.as_str() != pair.symbol()) {
            return Err(CatalogError::KeyMismatch {
                key: key.clone(),
                symbol: pair.symbol().to_string(),
            });
        }
        Ok(Self { pairs })
    }

    /// Builds a registry from an explicit pair list.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = Pair>) -> Self {
        Self {
            pairs: pairs
                .into_iter()
                .map(|pair| (pair.symbol().to_string(), pair))
                .collect(),
        }
    }

    /// Looks up a pair, exact spelling first, then upper-cased.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&Pair> {
        self.pairs
            .get(symbol)
            .or_else(|| self.pairs.get(&symbol.to_uppercase()))
    }

    /// Returns all pairs as an iterator.
    pub fn all(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.values()
    }

    /// Returns all active pairs.
    pub fn active(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.values().filter(|p| p.is_active())
    }

    /// Returns the total number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns pairs matching the given category.
    pub fn by_category(&self, category: PairCategory) -> impl Iterator<Item = &Pair> {
        self.pairs
            .values()
            .filter(move |p| p.category() == category)
    }

    /// Searches pairs by symbol or display name (case-insensitive).
    pub fn search(&self, pattern: &str) -> Vec<&Pair> {
        let pattern = pattern.to_lowercase();
        let mut found: Vec<&Pair> = self
            .pairs
            .values()
            .filter(|p| {
                p.symbol().to_lowercase().contains(&pattern)
                    || p.display_name().to_lowercase().contains(&pattern)
            })
            .collect();
        found.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        found
    }

    /// Returns all symbols sorted alphabetically.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.pairs.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

impl SymbolCatalog for PairRegistry {
    fn status(&self, symbol: &str) -> SymbolStatus<'_> {
        match self.get(symbol) {
            Some(pair) if pair.is_active() => SymbolStatus::Active(pair.symbol()),
            Some(pair) => SymbolStatus::Inactive(pair.symbol()),
            None => SymbolStatus::Unknown,
        }
    }
}
