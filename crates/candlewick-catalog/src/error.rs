//! Error types for the symbol catalog.

use candlewick_types::TickError;
use thiserror::Error;

/// Why a tick was refused admission.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Symbol is not in the catalog.
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),

    /// Symbol is in the catalog but inactive.
    #[error("inactive symbol '{0}'")]
    InactiveSymbol(String),

    /// Tick is not well-formed.
    #[error("malformed tick for '{symbol}': {source}")]
    MalformedTick {
        /// Symbol as received.
        symbol: String,
        /// What was wrong with the tick.
        source: TickError,
    },
}

impl Rejection {
    /// Returns the symbol as received.
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::UnknownSymbol(symbol)
            | Self::InactiveSymbol(symbol)
            | Self::MalformedTick { symbol, .. } => symbol,
        }
    }
}

/// Errors loading a pair catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Catalog JSON could not be parsed.
    #[error("invalid pair catalog: {0}")]
    Json(#[from] serde_json::Error),

    /// An entry is filed under a key different from its symbol.
    #[error("pair '{symbol}' is filed under key '{key}'")]
    KeyMismatch {
        /// Map key.
        key: String,
        /// Symbol inside the entry.
        symbol: String,
    },
}
