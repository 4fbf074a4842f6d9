//! Admission gate for incoming ticks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use candlewick_types::Tick;
use serde::Serialize;

use crate::{Rejection, SymbolCatalog, SymbolStatus};

/// Default number of distinct symbols tracked in
/// [`GateStats::rejected_by_symbol`].
pub const DEFAULT_TRACKED_SYMBOLS: usize = 1024;

/// Key collecting rejections for symbols beyond the tracking limit.
pub const OTHER_SYMBOLS: &str = "*other*";

/// Counters describing what the gate has seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GateStats {
    /// Ticks admitted.
    pub admitted: u64,
    /// Ticks rejected for an unknown symbol.
    pub unknown_symbol: u64,
    /// Ticks rejected for an inactive symbol.
    pub inactive_symbol: u64,
    /// Ticks rejected as malformed.
    pub malformed: u64,
    /// Rejections per offending symbol, as received. Symbols past the
    /// tracking limit are counted under [`OTHER_SYMBOLS`].
    pub rejected_by_symbol: HashMap<String, u64>,
}

impl GateStats {
    /// Returns the total number of rejected ticks.
    #[must_use]
    pub const fn rejected(&self) -> u64 {
        self.unknown_symbol + self.inactive_symbol + self.malformed
    }
}

/// Validates ticks against a [`SymbolCatalog`] before admission.
///
/// Admitted ticks are returned with the catalog's canonical symbol spelling.
pub struct SymbolGate {
    catalog: Arc<dyn SymbolCatalog>,
    admitted: AtomicU64,
    unknown_symbol: AtomicU64,
    inactive_symbol: AtomicU64,
    malformed: AtomicU64,
    rejected_by_symbol: Mutex<HashMap<String, u64>>,
    tracked_symbols: usize,
}

impl std::fmt::Debug for SymbolGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolGate")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl SymbolGate {
    /// Creates a gate backed by `catalog`.
    pub fn new(catalog: Arc<dyn SymbolCatalog>) -> Self {
        Self {
            catalog,
            admitted: AtomicU64::new(0),
            unknown_symbol: AtomicU64::new(0),
            inactive_symbol: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            rejected_by_symbol: Mutex::new(HashMap::new()),
            tracked_symbols: DEFAULT_TRACKED_SYMBOLS,
        }
    }

    /// Caps the distinct symbols kept in the per-symbol rejection counts.
    #[must_use]
    pub const fn with_tracked_symbols(mut self, limit: usize) -> Self {
        self.tracked_symbols = limit;
        self
    }

    /// Returns the catalog the gate validates against.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn SymbolCatalog> {
        &self.catalog
    }

    /// Admits or rejects a tick.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] if the symbol is unknown or inactive, or the
    /// tick is not well-formed.
    pub fn admit(&self, mut tick: Tick) -> Result<Tick, Rejection> {
        let outcome = match self.catalog.status(&tick.symbol) {
            SymbolStatus::Active(canonical) => match tick.validate() {
                Ok(()) => {
                    if canonical != tick.symbol {
                        tick.symbol = canonical.to_string();
                    }
                    Ok(tick)
                }
                Err(source) => Err(Rejection::MalformedTick {
                    symbol: tick.symbol,
                    source,
                }),
            },
            SymbolStatus::Inactive(_) => Err(Rejection::InactiveSymbol(tick.symbol)),
            SymbolStatus::Unknown => Err(Rejection::UnknownSymbol(tick.symbol)),
        };

        match &outcome {
            Ok(_) => {
                self.admitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(rejection) => self.record(rejection),
        }
        outcome
    }

    fn record(&self, rejection: &Rejection) {
        let counter = match rejection {
            Rejection::UnknownSymbol(_) => &self.unknown_symbol,
            Rejection::InactiveSymbol(_) => &self.inactive_symbol,
            Rejection::MalformedTick { .. } => &self.malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let symbol = rejection.symbol();
        let (seen, overflow) = {
            let mut per_symbol = self
                .rejected_by_symbol
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            // the overflow key does not count against the limit
            let tracked = per_symbol.len() - usize::from(per_symbol.contains_key(OTHER_SYMBOLS));
            let overflow = !per_symbol.contains_key(symbol) && tracked >= self.tracked_symbols;
            let key = if overflow { OTHER_SYMBOLS } else { symbol };
            let count = per_symbol.entry(key.to_string()).or_insert(0);
            *count += 1;
            (*count, overflow)
        };

        match (seen, overflow) {
            (1, false) => tracing::warn!(symbol, %rejection, "tick rejected"),
            (1, true) => tracing::warn!(
                symbol,
                %rejection,
                limit = self.tracked_symbols,
                "tick rejected, per-symbol tracking full"
            ),
            _ => tracing::debug!(symbol, %rejection, seen, "tick rejected"),
        }
    }

    /// Returns a snapshot of the gate counters.
    #[must_use]
    pub fn stats(&self) -> GateStats {
        GateStats {
            admitted: self.admitted.load(Ordering::Relaxed),
            unknown_symbol: self.unknown_symbol.load(Ordering::Relaxed),
            inactive_symbol: self.inactive_symbol.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            rejected_by_symbol: self
                .rejected_by_symbol
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pair, PairCategory, PairRegistry};
    use chrono::{TimeZone, Utc};

    fn gate() -> SymbolGate {
        let registry = PairRegistry::from_pairs([
            Pair::new("BTC", "Bitcoin", PairCategory::Major, 50, 0.001, 0.1),
            Pair::new("OLD", "Delisted", PairCategory::SmallCap, 3, 1.0, 0.01).with_active(false),
        ]);
        SymbolGate::new(Arc::new(registry))
    }

    fn tick(symbol: &str, price: f64) -> Tick {
        Tick::new(symbol, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), price, 1.0)
    }

    #[test]
    fn test_admit_canonicalizes_symbol() {
        let gate = gate();
        let admitted = gate.admit(tick("btc", 100.0)).unwrap();
        assert_eq!(admitted.symbol, "BTC");
        assert_eq!(gate.stats().admitted, 1);
    }

    #[test]
    fn test_rejections_are_typed_and_counted() {
        let gate = gate();
        assert_eq!(
            gate.admit(tick("NOPE", 1.0)).unwrap_err(),
            Rejection::UnknownSymbol("NOPE".into())
        );
        assert_eq!(
            gate.admit(tick("OLD", 1.0)).unwrap_err(),
            Rejection::InactiveSymbol("OLD".into())
        );
        assert!(matches!(
            gate.admit(tick("BTC", -1.0)).unwrap_err(),
            Rejection::MalformedTick { .. }
        ));
        gate.admit(tick("NOPE", 2.0)).unwrap_err();

        let stats = gate.stats();
        assert_eq!(stats.admitted, 0);
        assert_eq!(stats.unknown_symbol, 2);
        assert_eq!(stats.inactive_symbol, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.rejected(), 4);
        assert_eq!(stats.rejected_by_symbol["NOPE"], 2);
    }

    #[test]
    fn test_rejected_symbols_are_capped() {
        let gate = gate().with_tracked_symbols(2);
        for i in 0..50 {
            gate.admit(tick(&format!("JUNK{i}"), 1.0)).unwrap_err();
        }
        gate.admit(tick("JUNK0", 1.0)).unwrap_err();

        let stats = gate.stats();
        assert_eq!(stats.unknown_symbol, 51);
        assert_eq!(stats.rejected_by_symbol.len(), 3);
        assert_eq!(stats.rejected_by_symbol["JUNK0"], 2);
        assert_eq!(stats.rejected_by_symbol["JUNK1"], 1);
        assert_eq!(stats.rejected_by_symbol[OTHER_SYMBOLS], 48);
        assert_eq!(stats.rejected_by_symbol.values().sum::<u64>(), stats.rejected());
    }
}
