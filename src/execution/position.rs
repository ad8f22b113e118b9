//! Net position accounting
//!
//! One position per symbol. Fills in the same direction average in, fills
//! in the opposite direction realize P&L, and a fill larger than the open
//! quantity closes the position and opens the remainder the other way.

use super::{Fill, Position, Trade};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

/// Effects of applying one fill
#[derive(Debug, Clone, Default)]
pub struct FillEffect {
    /// P&L realized by this fill (before commission)
    pub realized_pnl: Decimal,
    /// Round trip completed by this fill
    pub closed_trade: Option<Trade>,
}

/// Open position plus the exit bookkeeping needed to emit a trade
#[derive(Debug, Clone)]
struct OpenPosition {
    position: Position,
    closed_contracts: u32,
    exit_value: Decimal,
}

impl OpenPosition {
    fn open(fill: &Fill, contracts: u32) -> Self {
        Self {
            position: Position {
                symbol: fill.symbol.clone(),
                side: fill.side,
                contracts,
                avg_entry_price: fill.price,
                realized_pnl: Decimal::ZERO,
                unrealized_pnl: Decimal::ZERO,
                opened_at: fill.timestamp,
                updated_at: fill.timestamp,
            },
            closed_contracts: 0,
            exit_value: Decimal::ZERO,
        }
    }

    fn into_trade(self, closed_at: DateTime<Utc>) -> Trade {
        let exit_price = if self.closed_contracts == 0 {
            self.position.avg_entry_price
        } else {
            self.exit_value / Decimal::from(self.closed_contracts)
        };
        Trade {
            id: Uuid::new_v4(),
            symbol: self.position.symbol,
            side: self.position.side,
            contracts: self.closed_contracts,
            entry_price: self.position.avg_entry_price,
            exit_price,
            realized_pnl: self.position.realized_pnl,
            opened_at: self.position.opened_at,
            closed_at,
        }
    }
}

/// Tracks net positions, closed trades and total realized P&L
#[derive(Debug, Default)]
pub struct PositionBook {
    open: HashMap<String, OpenPosition>,
    trades: Vec<Trade>,
    realized_pnl: Decimal,
}

impl PositionBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a fill; `point_value` converts price points to money
    pub fn apply_fill(&mut self, fill: &Fill, point_value: Decimal) -> FillEffect {
        if fill.contracts == 0 {
            return FillEffect::default();
        }

        let Some(mut existing) = self.open.remove(&fill.symbol) else {
            self.open
                .insert(fill.symbol.clone(), OpenPosition::open(fill, fill.contracts));
            return FillEffect::default();
        };

        if existing.position.side == fill.side {
            let pos = &mut existing.position;
            let old_qty = Decimal::from(pos.contracts);
            let add_qty = Decimal::from(fill.contracts);
            pos.avg_entry_price =
                (pos.avg_entry_price * old_qty + fill.price * add_qty) / (old_qty + add_qty);
            pos.contracts += fill.contracts;
            pos.updated_at = fill.timestamp;
            self.open.insert(fill.symbol.clone(), existing);
            return FillEffect::default();
        }

        let closing = fill.contracts.min(existing.position.contracts);
        let realized = (fill.price - existing.position.avg_entry_price)
            * Decimal::from(closing)
            * existing.position.side.sign()
            * point_value;

        existing.position.contracts -= closing;
        existing.position.realized_pnl += realized;
        existing.position.updated_at = fill.timestamp;
        existing.closed_contracts += closing;
        existing.exit_value += fill.price * Decimal::from(closing);
        self.realized_pnl += realized;

        let mut effect = FillEffect {
            realized_pnl: realized,
            closed_trade: None,
        };

        if existing.position.contracts == 0 {
            let trade = existing.into_trade(fill.timestamp);
            self.trades.push(trade.clone());
            effect.closed_trade = Some(trade);
        } else {
            self.open.insert(fill.symbol.clone(), existing);
        }

        let remainder = fill.contracts - closing;
        if remainder > 0 {
            self.open
                .insert(fill.symbol.clone(), OpenPosition::open(fill, remainder));
        }

        effect
    }

    /// Snapshot of the open position in `symbol`
    pub fn position(&self, symbol: &str) -> Option<Position> {
        self.open.get(symbol).map(|p| p.position.clone())
    }

    /// Snapshots of all open positions
    pub fn positions(&self) -> Vec<Position> {
        self.open.values().map(|p| p.position.clone()).collect()
    }

    /// Closed round trips in completion order
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Total realized P&L across all fills
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Signed open contracts in `symbol`
    pub fn signed_contracts(&self, symbol: &str) -> Decimal {
        self.open
            .get(symbol)
            .map(|p| p.position.signed_contracts())
            .unwrap_or(Decimal::ZERO)
    }

    /// Number of open positions
    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}
