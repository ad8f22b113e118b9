//! Signal types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side for intents and positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy / long exposure
    Long,
    /// Sell / short exposure
    Short,
}

impl Side {
    /// +1 for long, -1 for short
    pub fn sign(self) -> Decimal {
        match self {
            Side::Long => Decimal::ONE,
            Side::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// The other side
    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

/// Direction requested by a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Go or stay long
    Long,
    /// Go or stay short
    Short,
    /// Close any open position
    Flat,
}

impl Direction {
    /// Order side for an entry in this direction
    pub fn side(self) -> Option<Side> {
        match self {
            Direction::Long => Some(Side::Long),
            Direction::Short => Some(Side::Short),
            Direction::Flat => None,
        }
    }
}

/// A trading signal, consumed exactly once by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Strategy-assigned identifier
    pub id: String,
    /// Instrument symbol
    pub symbol: String,
    /// Requested direction
    pub direction: Direction,
    /// Protective stop distance in ticks
    pub stop_ticks: u32,
    /// Strength score in [0, 1]
    pub strength: Decimal,
    /// Human-readable rationale
    pub rationale: String,
    /// Name of the originating strategy
    pub strategy: String,
}

impl Signal {
    /// Create a new signal; strength is clamped to [0, 1]
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        direction: Direction,
        stop_ticks: u32,
        strength: Decimal,
        rationale: impl Into<String>,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            direction,
            stop_ticks,
            strength: strength.max(Decimal::ZERO).min(Decimal::ONE),
            rationale: rationale.into(),
            strategy: strategy.into(),
        }
    }
}
