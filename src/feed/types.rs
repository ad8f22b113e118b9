//! Market data types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single price bar for one instrument
///
/// Indicator fields are left empty by the feed and filled in by a
/// [`Calculator`](crate::indicators::Calculator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    /// Instrument symbol (e.g., "MES")
    pub symbol: String,
    /// Bar timestamp
    pub timestamp: DateTime<Utc>,
    /// Open price
    pub open: Decimal,
    /// High price
    pub high: Decimal,
    /// Low price
    pub low: Decimal,
    /// Close price
    pub close: Decimal,
    /// Traded volume
    #[serde(default)]
    pub volume: Decimal,
    /// Average true range
    #[serde(default)]
    pub atr: Option<Decimal>,
    /// Standard deviation of closes
    #[serde(default)]
    pub std_dev: Option<Decimal>,
}

impl MarketEvent {
    /// Create a bar without indicator fields
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            atr: None,
            std_dev: None,
        }
    }

    /// Create a flat bar where every price equals `price`
    pub fn flat(symbol: impl Into<String>, price: Decimal) -> Self {
        Self::new(symbol, Utc::now(), price, price, price, price, Decimal::ZERO)
    }

    /// Copy of this bar with indicator fields set
    pub fn with_indicators(mut self, atr: Option<Decimal>, std_dev: Option<Decimal>) -> Self {
        self.atr = atr;
        self.std_dev = std_dev;
        self
    }
}
