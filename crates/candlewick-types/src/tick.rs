//! Tick data representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TickError;

/// A single price/volume observation for one symbol.
///
/// Ticks are immutable once observed and are never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Trading symbol the tick belongs to.
    pub symbol: String,
    /// Observation time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Trade price.
    pub price: f64,
    /// Traded volume.
    pub volume: f64,
}

impl Tick {
    /// Creates a new tick.
    #[must_use]
    pub fn new(symbol: impl Into<String>, timestamp: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            price,
            volume,
        }
    }

    /// Returns `price * volume`.
    #[must_use]
    pub fn notional(&self) -> f64 {
        self.price * self.volume
    }

    /// Returns the timestamp as Unix epoch milliseconds.
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Checks that the tick is well-formed.
    ///
    /// # Errors
    ///
    /// Returns a [`TickError`] if the timestamp precedes the Unix epoch, the
    /// price is not finite and positive, or the volume is not finite and
    /// non-negative.
    pub fn validate(&self) -> Result<(), TickError> {
        if self.timestamp < DateTime::UNIX_EPOCH {
            return Err(TickError::BeforeEpoch(self.timestamp));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(TickError::InvalidPrice(self.price));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(TickError::InvalidVolume(self.volume));
        }
        Ok(())
    }
}
