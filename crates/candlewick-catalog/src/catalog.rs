//! Symbol catalog abstraction.

use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of looking a symbol up in a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolStatus<'a> {
    /// Known and accepting ticks; carries the canonical spelling.
    Active(&'a str),
    /// Known but not accepting ticks; carries the canonical spelling.
    Inactive(&'a str),
    /// Not in the catalog.
    Unknown,
}

/// An authoritative list of tradable symbols.
///
/// Lookups try the exact spelling first, then the upper-cased spelling, so
/// `btc` resolves to `BTC` while mixed-case symbols like `kBONK` must match
/// exactly.
pub trait SymbolCatalog: Send + Sync {
    /// Looks up `symbol`.
    fn status(&self, symbol: &str) -> SymbolStatus<'_>;

    /// Returns the canonical spelling of an active symbol.
    fn resolve(&self, symbol: &str) -> Option<&str> {
        match self.status(symbol) {
            SymbolStatus::Active(canonical) => Some(canonical),
            SymbolStatus::Inactive(_) | SymbolStatus::Unknown => None,
        }
    }

    /// Returns true if `symbol` is known and active.
    fn is_valid(&self, symbol: &str) -> bool {
        self.resolve(symbol).is_some()
    }
}

impl SymbolCatalog for HashSet<String> {
    fn status(&self, symbol: &str) -> SymbolStatus<'_> {
        self.get(symbol)
            .or_else(|| self.get(&symbol.to_uppercase()))
            .map_or(SymbolStatus::Unknown, |s| SymbolStatus::Active(s.as_str()))
    }
}

impl<T: SymbolCatalog + ?Sized> SymbolCatalog for Arc<T> {
    fn status(&self, symbol: &str) -> SymbolStatus<'_> {
        (**self).status(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> HashSet<String> {
        ["BTC", "ETH", "kPEPE"].iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_hash_set_exact_then_upper() {
        let catalog = set();
        assert_eq!(catalog.resolve("BTC"), Some("BTC"));
        assert_eq!(catalog.resolve("eth"), Some("ETH"));
        assert_eq!(catalog.resolve("kPEPE"), Some("kPEPE"));
        assert_eq!(catalog.resolve("kpepe"), None);
        assert!(!catalog.is_valid("DOGE"));
    }

    #[test]
    fn test_arc_dyn_catalog() {
        let catalog: Arc<dyn SymbolCatalog> = Arc::new(set());
        assert!(catalog.is_valid("btc"));
        assert_eq!(catalog.status("XRP"), SymbolStatus::Unknown);
    }
}
