//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures_bot::alert::RecordingAlerter;
use futures_bot::config::{EngineConfig, ExecutionConfig, RiskConfig};
use futures_bot::engine::TradingEngine;
use futures_bot::execution::{
    AccountSummary, Broker, ExecutionError, Instrument, MarketDataStream, Order, OrderAck, OrderId,
    OrderIntent, PaperBroker, Position,
};
use futures_bot::feed::MarketEvent;
use futures_bot::indicators::Calculator;
use futures_bot::risk::RiskEngine;
use futures_bot::signal::{Direction, Signal, Strategy};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn mes() -> Instrument {
    Instrument {
        symbol: "MES".to_string(),
        tick_size: dec!(0.25),
        tick_value: dec!(1.25),
    }
}

pub fn execution_config(fill_delay_ms: u64) -> ExecutionConfig {
    ExecutionConfig {
        starting_equity: dec!(10000),
        fill_delay_ms,
        slippage_ticks: 1,
        commission_per_contract: dec!(0.62),
        margin_per_contract: Decimal::ZERO,
        market_data_capacity: 64,
    }
}

pub fn paper_broker(fill_delay_ms: u64) -> PaperBroker {
    PaperBroker::new(execution_config(fill_delay_ms), vec![mes()])
}

/// Engine config with a long reconcile interval so tests drive it by hand
pub fn engine_config() -> EngineConfig {
    EngineConfig {
        reconcile_interval_ms: 60_000,
        shutdown_grace_ms: 2_000,
        ..EngineConfig::new("MES")
    }
}

pub fn bar(close: Decimal) -> MarketEvent {
    MarketEvent::flat("MES", close)
}

pub fn signal(id: &str, direction: Direction, stop_ticks: u32) -> Signal {
    Signal::new(id, "MES", direction, stop_ticks, dec!(1), "scripted", "scripted")
}

/// Emits one queued batch of signals per bar
pub struct ScriptedStrategy {
    script: VecDeque<Vec<Signal>>,
}

impl ScriptedStrategy {
    pub fn new(script: Vec<Vec<Signal>>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// One signal on the first bar, nothing after
    pub fn once(signal: Signal) -> Self {
        Self::new(vec![vec![signal]])
    }
}

impl Strategy for ScriptedStrategy {
    fn process(&mut self, _event: &MarketEvent) -> Vec<Signal> {
        self.script.pop_front().unwrap_or_default()
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn reset(&mut self) {}
}

/// Leaves bars untouched
pub struct PassThrough;

impl Calculator for PassThrough {
    fn enrich(&mut self, event: MarketEvent) -> MarketEvent {
        event
    }
}

/// Paper broker with switchable failures
pub struct FlakyBroker {
    pub inner: PaperBroker,
    pub fail_subscribe: AtomicBool,
    pub fail_account: AtomicBool,
    pub hang_open_orders: AtomicBool,
    /// Delay before each order reaches the paper broker
    pub place_delay_ms: AtomicU64,
}

impl FlakyBroker {
    pub fn new(inner: PaperBroker) -> Self {
        Self {
            inner,
            fail_subscribe: AtomicBool::new(false),
            fail_account: AtomicBool::new(false),
            hang_open_orders: AtomicBool::new(false),
            place_delay_ms: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Broker for FlakyBroker {
    async fn connect(&self) -> Result<(), ExecutionError> {
        self.inner.connect().await
    }

    async fn disconnect(&self) -> Result<(), ExecutionError> {
        self.inner.disconnect().await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn account_summary(&self) -> Result<AccountSummary, ExecutionError> {
        if self.fail_account.load(Ordering::SeqCst) {
            return Err(ExecutionError::NotConnected);
        }
        self.inner.account_summary().await
    }

    async fn subscribe_market_data(&self, symbol: &str) -> Result<MarketDataStream, ExecutionError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(ExecutionError::Subscription {
                symbol: symbol.to_string(),
                reason: "feed unavailable".to_string(),
            });
        }
        self.inner.subscribe_market_data(symbol).await
    }

    async fn unsubscribe_market_data(&self, symbol: &str) -> Result<(), ExecutionError> {
        self.inner.unsubscribe_market_data(symbol).await
    }

    async fn place_order(&self, intent: OrderIntent) -> Result<OrderAck, ExecutionError> {
        let delay = self.place_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.inner.place_order(intent).await
    }

    async fn cancel_order(&self, id: OrderId) -> Result<(), ExecutionError> {
        self.inner.cancel_order(id).await
    }

    async fn open_orders(&self) -> Result<Vec<Order>, ExecutionError> {
        if self.hang_open_orders.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.inner.open_orders().await
    }

    async fn position(&self, symbol: &str) -> Result<Option<Position>, ExecutionError> {
        self.inner.position(symbol).await
    }
}

pub fn build_engine(
    config: EngineConfig,
    broker: Arc<dyn Broker>,
    risk: Arc<RiskEngine>,
    strategy: ScriptedStrategy,
    alerter: Arc<RecordingAlerter>,
) -> TradingEngine {
    TradingEngine::new(
        config,
        mes(),
        broker,
        risk,
        Box::new(strategy),
        Box::new(PassThrough),
        alerter,
    )
}

pub fn risk_engine(equity: Decimal) -> Arc<RiskEngine> {
    Arc::new(RiskEngine::new(RiskConfig::default(), equity))
}

/// Poll `check` until it holds or `timeout` elapses
pub async fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
