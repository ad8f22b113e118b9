//! Execution module
//!
//! The broker contract the engine trades through, plus the in-process
//! paper broker that implements it

mod fanout;
mod position;
mod simulator;
mod types;

pub use fanout::{MarketDataHub, MarketDataStream};
pub use position::{FillEffect, PositionBook};
pub use simulator::PaperBroker;
pub use types::{
    AccountSummary, ExecutionError, Fill, Instrument, Order, OrderAck, OrderId, OrderIntent,
    OrderStatus, Position, Trade,
};

use async_trait::async_trait;

/// Trait for broker implementations, as seen by the engine
///
/// All returned orders and positions are snapshots.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Open the session
    async fn connect(&self) -> Result<(), ExecutionError>;
    /// Close the session
    async fn disconnect(&self) -> Result<(), ExecutionError>;
    /// Whether the session is open
    fn is_connected(&self) -> bool;
    /// Net liquidation and available funds
    async fn account_summary(&self) -> Result<AccountSummary, ExecutionError>;
    /// Start receiving bars for `symbol`
    async fn subscribe_market_data(&self, symbol: &str) -> Result<MarketDataStream, ExecutionError>;
    /// Stop receiving bars for `symbol`
    async fn unsubscribe_market_data(&self, symbol: &str) -> Result<(), ExecutionError>;
    /// Submit an order; business rejections come back as a `Rejected` ack
    async fn place_order(&self, intent: OrderIntent) -> Result<OrderAck, ExecutionError>;
    /// Cancel an order that has not reached a terminal state
    async fn cancel_order(&self, id: OrderId) -> Result<(), ExecutionError>;
    /// Orders not yet terminal
    async fn open_orders(&self) -> Result<Vec<Order>, ExecutionError>;
    /// Net position in `symbol`, if any
    async fn position(&self, symbol: &str) -> Result<Option<Position>, ExecutionError>;
}
