//! Execution types

use crate::signal::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Server-assigned order identifier
pub type OrderId = Uuid;

/// Contract specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Instrument symbol
    pub symbol: String,
    /// Minimum price increment
    pub tick_size: Decimal,
    /// Monetary value of one tick per contract
    pub tick_value: Decimal,
}

impl Instrument {
    /// Monetary value of a one-point move per contract
    pub fn point_value(&self) -> Decimal {
        if self.tick_size.is_zero() {
            return Decimal::ZERO;
        }
        self.tick_value / self.tick_size
    }
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created, not yet accepted
    Pending,
    /// Accepted, waiting for the fill
    Submitted,
    /// Executed
    Filled,
    /// Cancelled before filling
    Cancelled,
    /// Refused by the broker
    Rejected,
}

impl OrderStatus {
    /// Terminal states never change again
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// Still cancellable
    pub fn is_open(self) -> bool {
        !self.is_terminal()
    }
}

/// An order request from the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Caller-unique order identifier
    pub client_order_id: String,
    /// Instrument symbol
    pub symbol: String,
    /// Buy or sell
    pub side: Side,
    /// Number of contracts
    pub contracts: u32,
    /// Price the caller expects to trade near
    pub reference_price: Decimal,
}

/// Broker-side order record; callers only ever see clones
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Broker order ID
    pub id: OrderId,
    /// Originating client order ID
    pub client_order_id: String,
    /// Instrument symbol
    pub symbol: String,
    /// Buy or sell
    pub side: Side,
    /// Number of contracts
    pub contracts: u32,
    /// Reference price from the intent
    pub reference_price: Decimal,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Execution price once filled
    pub fill_price: Option<Decimal>,
    /// Commission charged on the fill
    pub commission: Decimal,
    /// Why the order was rejected or cancelled
    pub reason: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// New order in `Pending`
    pub fn from_intent(intent: &OrderIntent) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_order_id: intent.client_order_id.clone(),
            symbol: intent.symbol.clone(),
            side: intent.side,
            contracts: intent.contracts,
            reference_price: intent.reference_price,
            status: OrderStatus::Pending,
            fill_price: None,
            commission: Decimal::ZERO,
            reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next` unless the order is already terminal
    ///
    /// Returns the blocking status on failure.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), OrderStatus> {
        if self.status.is_terminal() {
            return Err(self.status);
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Contracts signed by side
    pub fn signed_contracts(&self) -> Decimal {
        Decimal::from(self.contracts) * self.side.sign()
    }
}

/// Synchronous answer to an order placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    /// Broker order ID
    pub order_id: OrderId,
    /// Client order ID echoed back
    pub client_order_id: String,
    /// `Submitted` or `Rejected`
    pub status: OrderStatus,
    /// Rejection reason
    pub reason: Option<String>,
}

impl OrderAck {
    /// Whether the broker refused the order
    pub fn is_rejected(&self) -> bool {
        self.status == OrderStatus::Rejected
    }
}

/// An executed fill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    /// Order ID
    pub order_id: OrderId,
    /// Instrument symbol
    pub symbol: String,
    /// Trade side
    pub side: Side,
    /// Fill price including slippage
    pub price: Decimal,
    /// Contracts filled
    pub contracts: u32,
    /// Commission charged
    pub commission: Decimal,
    /// Fill timestamp
    pub timestamp: DateTime<Utc>,
}

/// Net position in one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Instrument symbol
    pub symbol: String,
    /// Net direction
    pub side: Side,
    /// Open contracts, always positive while the position exists
    pub contracts: u32,
    /// Volume-weighted average entry price
    pub avg_entry_price: Decimal,
    /// P&L realized by partial closes of this position
    pub realized_pnl: Decimal,
    /// Mark-to-market P&L at the last known price
    pub unrealized_pnl: Decimal,
    /// First fill time
    pub opened_at: DateTime<Utc>,
    /// Last fill time
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Contracts signed by side
    pub fn signed_contracts(&self) -> Decimal {
        Decimal::from(self.contracts) * self.side.sign()
    }

    /// P&L of the open quantity at `price`
    pub fn pnl_at(&self, price: Decimal, point_value: Decimal) -> Decimal {
        (price - self.avg_entry_price) * Decimal::from(self.contracts) * self.side.sign() * point_value
    }
}

/// A closed round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Trade identifier
    pub id: Uuid,
    /// Instrument symbol
    pub symbol: String,
    /// Direction of the closed position
    pub side: Side,
    /// Contracts closed over the life of the position
    pub contracts: u32,
    /// Average entry price
    pub entry_price: Decimal,
    /// Volume-weighted average exit price
    pub exit_price: Decimal,
    /// Realized P&L before commissions
    pub realized_pnl: Decimal,
    /// Position open time
    pub opened_at: DateTime<Utc>,
    /// Position close time
    pub closed_at: DateTime<Utc>,
}

impl Trade {
    /// Whether the round trip made money
    pub fn is_win(&self) -> bool {
        self.realized_pnl > Decimal::ZERO
    }
}

/// Account figures derived from recorded fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Starting equity + realized P&L - commissions
    pub net_liquidation: Decimal,
    /// Net liquidation minus margin in use
    pub available_funds: Decimal,
    /// Sum of realized P&L
    pub realized_pnl: Decimal,
    /// Sum of commissions paid
    pub commissions: Decimal,
    /// Margin held by positions and open orders
    pub margin_in_use: Decimal,
}

/// Execution errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// Broker session is not connected
    #[error("broker not connected")]
    NotConnected,
    /// Unknown order
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),
    /// Cancel lost the race against the fill
    #[error("order {0} already filled")]
    AlreadyFilled(OrderId),
    /// Order already cancelled or rejected
    #[error("order {id} already terminal: {status:?}")]
    AlreadyTerminal {
        /// Order ID
        id: OrderId,
        /// Terminal status
        status: OrderStatus,
    },
    /// Market data subscription failed
    #[error("market data subscription failed for {symbol}: {reason}")]
    Subscription {
        /// Requested symbol
        symbol: String,
        /// Failure detail
        reason: String,
    },
    /// Instrument not configured on this broker
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),
}
