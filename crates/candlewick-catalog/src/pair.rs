//! Tradable pair definitions.

use serde::{Deserialize, Serialize};

/// Pair category, by liquidity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairCategory {
    /// Highest-liquidity majors.
    Major,
    /// Established mid-cap assets.
    MidCap,
    /// Recently listed or fast-growing assets.
    Emerging,
    /// Small-cap and meme assets.
    SmallCap,
}

impl PairCategory {
    /// Returns the category as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::MidCap => "mid-cap",
            Self::Emerging => "emerging",
            Self::SmallCap => "small-cap",
        }
    }

    /// Returns all categories, most liquid first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Major, Self::MidCap, Self::Emerging, Self::SmallCap]
    }
}

impl std::fmt::Display for PairCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PairCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "major" => Ok(Self::Major),
            "mid-cap" | "midcap" => Ok(Self::MidCap),
            "emerging" => Ok(Self::Emerging),
            "small-cap" | "smallcap" => Ok(Self::SmallCap),
            _ => Err(format!("unknown pair category '{s}'")),
        }
    }
}

/// A tradable perpetual pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    symbol: String,
    display_name: String,
    quote_asset: String,
    category: PairCategory,
    max_leverage: u32,
    min_order_size: f64,
    tick_size: f64,
    is_active: bool,
}

impl Pair {
    /// Creates a new active pair quoted in USD.
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        display_name: impl Into<String>,
        category: PairCategory,
        max_leverage: u32,
        min_order_size: f64,
        tick_size: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            display_name: display_name.into(),
            quote_asset: "USD".to_string(),
            category,
            max_leverage,
            min_order_size,
            tick_size,
            is_active: true,
        }
    }

    /// Returns a copy of this pair with the given active flag.
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Returns the canonical symbol (e.g. "BTC", "kPEPE").
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the human-readable name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the quote asset.
    #[must_use]
    pub fn quote_asset(&self) -> &str {
        &self.quote_asset
    }

    /// Returns the pair category.
    #[must_use]
    pub const fn category(&self) -> PairCategory {
        self.category
    }

    /// Returns the maximum leverage offered.
    #[must_use]
    pub const fn max_leverage(&self) -> u32 {
        self.max_leverage
    }

    /// Returns the minimum order size in base units.
    #[must_use]
    pub const fn min_order_size(&self) -> f64 {
        self.min_order_size
    }

    /// Returns the minimum price increment.
    #[must_use]
    pub const fn tick_size(&self) -> f64 {
        self.tick_size
    }

    /// Returns true if the pair currently accepts ticks.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the exchange-style name, e.g. "BTC-USD".
    #[must_use]
    pub fn market_name(&self) -> String {
        format!("{}-{}", self.symbol, self.quote_asset)
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name, self.symbol)
    }
}
