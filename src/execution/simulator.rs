//! Paper broker with delayed fills
//!
//! Orders are accepted synchronously and filled by a per-order timer task at
//! the last published price plus adverse slippage. Three independent locks
//! guard the ledger (orders, positions, account), the price cache and the
//! market data queues; no code path holds two of them at once.

use super::fanout::{MarketDataHub, MarketDataStream};
use super::position::PositionBook;
use super::{
    AccountSummary, Broker, ExecutionError, Fill, Instrument, Order, OrderAck, OrderId,
    OrderIntent, OrderStatus, Position, Trade,
};
use crate::config::ExecutionConfig;
use crate::feed::MarketEvent;
use crate::shutdown;
use crate::signal::Side;
use crate::telemetry::{increment_counter, CounterMetric};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Orders, positions and account totals; mutated only by the broker
struct Ledger {
    orders: HashMap<OrderId, Order>,
    /// Ids of orders still `Submitted`; terminal orders stay in `orders` only
    open: HashSet<OrderId>,
    client_ids: HashSet<String>,
    positions: PositionBook,
    fills: Vec<Fill>,
    commissions: Decimal,
}

impl Ledger {
    fn new() -> Self {
        Self {
            orders: HashMap::new(),
            open: HashSet::new(),
            client_ids: HashSet::new(),
            positions: PositionBook::new(),
            fills: Vec::new(),
            commissions: Decimal::ZERO,
        }
    }

    /// Record a rejected order and build its ack
    fn reject(&mut self, mut order: Order, reason: String) -> OrderAck {
        order.status = OrderStatus::Rejected;
        order.reason = Some(reason.clone());
        let ack = OrderAck {
            order_id: order.id,
            client_order_id: order.client_order_id.clone(),
            status: OrderStatus::Rejected,
            reason: Some(reason),
        };
        self.orders.insert(order.id, order);
        ack
    }

    fn open_orders(&self) -> impl Iterator<Item = &Order> {
        self.open.iter().filter_map(|id| self.orders.get(id))
    }

    /// Mark `id` terminal in the open index
    fn close(&mut self, id: &OrderId) {
        self.open.remove(id);
    }

    /// Signed contracts of still-open orders in `symbol`
    fn pending_signed(&self, symbol: &str) -> Decimal {
        self.open_orders()
            .filter(|o| o.symbol == symbol)
            .map(Order::signed_contracts)
            .sum()
    }

    fn margin_in_use(&self, margin_per_contract: Decimal) -> Decimal {
        if margin_per_contract.is_zero() {
            return Decimal::ZERO;
        }
        let held: u32 = self.positions.positions().iter().map(|p| p.contracts).sum();
        let pending: u32 = self.open_orders().map(|o| o.contracts).sum();
        Decimal::from(held + pending) * margin_per_contract
    }

    fn account(&self, config: &ExecutionConfig) -> AccountSummary {
        let realized = self.positions.realized_pnl();
        let net_liquidation = config.starting_equity + realized - self.commissions;
        let margin_in_use = self.margin_in_use(config.margin_per_contract);
        AccountSummary {
            net_liquidation,
            available_funds: net_liquidation - margin_in_use,
            realized_pnl: realized,
            commissions: self.commissions,
            margin_in_use,
        }
    }
}

struct Inner {
    config: ExecutionConfig,
    instruments: HashMap<String, Instrument>,
    connected: AtomicBool,
    /// `true` while disconnected; fill timers exit when it flips
    session_closed: watch::Sender<bool>,
    ledger: Mutex<Ledger>,
    prices: RwLock<HashMap<String, Decimal>>,
    market_data: MarketDataHub,
}

/// In-process execution simulator
#[derive(Clone)]
pub struct PaperBroker {
    inner: Arc<Inner>,
}

impl PaperBroker {
    /// Create a disconnected paper broker trading `instruments`
    pub fn new(config: ExecutionConfig, instruments: Vec<Instrument>) -> Self {
        let (session_closed, _) = watch::channel(true);
        let market_data = MarketDataHub::new(config.market_data_capacity);
        Self {
            inner: Arc::new(Inner {
                instruments: instruments
                    .into_iter()
                    .map(|i| (i.symbol.clone(), i))
                    .collect(),
                connected: AtomicBool::new(false),
                session_closed,
                ledger: Mutex::new(Ledger::new()),
                prices: RwLock::new(HashMap::new()),
                market_data,
                config,
            }),
        }
    }

    /// Publish a bar: update the price cache, then fan it out
    pub fn publish(&self, event: MarketEvent) -> usize {
        self.inner
            .prices
            .write()
            .insert(event.symbol.clone(), event.close);
        self.inner.market_data.publish(event)
    }

    /// Last published close for `symbol`
    pub fn last_price(&self, symbol: &str) -> Option<Decimal> {
        self.inner.prices.read().get(symbol).copied()
    }

    /// Snapshot of a single order
    pub fn order(&self, id: OrderId) -> Option<Order> {
        self.inner.ledger.lock().orders.get(&id).cloned()
    }

    /// Closed round trips
    pub fn trades(&self) -> Vec<Trade> {
        self.inner.ledger.lock().positions.trades().to_vec()
    }

    /// Every fill so far
    pub fn fills(&self) -> Vec<Fill> {
        self.inner.ledger.lock().fills.clone()
    }

    fn ensure_connected(&self) -> Result<(), ExecutionError> {
        if self.inner.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ExecutionError::NotConnected)
        }
    }

    /// Validate and record an intent; returns the ack and whether to start a fill timer
    fn accept(&self, intent: &OrderIntent) -> OrderAck {
        let order = Order::from_intent(intent);
        let mut ledger = self.inner.ledger.lock();

        if !self.inner.instruments.contains_key(&intent.symbol) {
            return ledger.reject(order, format!("unknown instrument {}", intent.symbol));
        }
        if intent.contracts == 0 {
            return ledger.reject(order, "zero contracts".to_string());
        }
        if ledger.client_ids.contains(&intent.client_order_id) {
            return ledger.reject(
                order,
                format!("duplicate client order id {}", intent.client_order_id),
            );
        }

        let margin = self.inner.config.margin_per_contract;
        if margin > Decimal::ZERO {
            let current =
                ledger.positions.signed_contracts(&intent.symbol) + ledger.pending_signed(&intent.symbol);
            let projected = current + order.signed_contracts();
            let added = (projected.abs() - current.abs()).max(Decimal::ZERO);
            let required = added * margin;
            let available = ledger.account(&self.inner.config).available_funds;
            if required > available {
                return ledger.reject(
                    order,
                    format!("insufficient margin: required {required}, available {available}"),
                );
            }
        }

        let mut order = order;
        // Pending -> Submitted on a fresh order cannot fail
        let _ = order.transition(OrderStatus::Submitted);
        let ack = OrderAck {
            order_id: order.id,
            client_order_id: order.client_order_id.clone(),
            status: OrderStatus::Submitted,
            reason: None,
        };
        ledger.client_ids.insert(order.client_order_id.clone());
        ledger.open.insert(order.id);
        ledger.orders.insert(order.id, order);
        ack
    }

    fn spawn_fill_timer(&self, order_id: OrderId) {
        let inner = Arc::clone(&self.inner);
        let mut closed = inner.session_closed.subscribe();
        let delay = inner.config.fill_delay();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown::requested(&mut closed) => {
                    debug!(%order_id, "Fill timer abandoned, session closed");
                    return;
                }
            }
            Inner::execute_fill(&inner, order_id);
        });
    }
}

impl Inner {
    /// Fill `order_id` if it is still `Submitted`
    ///
    /// Status check and fill happen under the same ledger lock as cancels, so
    /// exactly one of them wins.
    fn execute_fill(inner: &Inner, order_id: OrderId) {
        let symbol = match inner.ledger.lock().orders.get(&order_id) {
            Some(order) if order.status == OrderStatus::Submitted => order.symbol.clone(),
            _ => return,
        };
        let last_price = inner.prices.read().get(&symbol).copied();
        let Some(instrument) = inner.instruments.get(&symbol) else {
            return;
        };

        let mut ledger = inner.ledger.lock();
        let Some(order) = ledger.orders.get_mut(&order_id) else {
            return;
        };
        if order.status != OrderStatus::Submitted {
            return;
        }

        let Some(price) = last_price else {
            let _ = order.transition(OrderStatus::Rejected);
            order.reason = Some("no market price".to_string());
            ledger.close(&order_id);
            warn!(%order_id, %symbol, "Fill rejected, no market price observed");
            increment_counter(CounterMetric::OrdersRejected);
            return;
        };

        let slippage = Decimal::from(inner.config.slippage_ticks) * instrument.tick_size;
        let fill_price = match order.side {
            Side::Long => price + slippage,
            Side::Short => price - slippage,
        };
        let commission = inner.config.commission_per_contract * Decimal::from(order.contracts);

        let _ = order.transition(OrderStatus::Filled);
        order.fill_price = Some(fill_price);
        order.commission = commission;

        let fill = Fill {
            order_id,
            symbol: order.symbol.clone(),
            side: order.side,
            price: fill_price,
            contracts: order.contracts,
            commission,
            timestamp: Utc::now(),
        };

        ledger.close(&order_id);
        ledger.commissions += commission;
        let effect = ledger.positions.apply_fill(&fill, instrument.point_value());
        ledger.fills.push(fill.clone());
        drop(ledger);

        increment_counter(CounterMetric::OrdersFilled);
        info!(
            %order_id,
            symbol = %fill.symbol,
            side = ?fill.side,
            contracts = fill.contracts,
            price = %fill.price,
            %commission,
            realized_pnl = %effect.realized_pnl,
            "Paper order filled"
        );
        if let Some(trade) = effect.closed_trade {
            info!(
                symbol = %trade.symbol,
                contracts = trade.contracts,
                entry = %trade.entry_price,
                exit = %trade.exit_price,
                pnl = %trade.realized_pnl,
                "Round trip closed"
            );
        }
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn connect(&self) -> Result<(), ExecutionError> {
        self.inner.session_closed.send_replace(false);
        self.inner.connected.store(true, Ordering::SeqCst);
        info!("Paper broker connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ExecutionError> {
        if !self.inner.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.session_closed.send_replace(true);

        let cancelled = {
            let mut ledger = self.inner.ledger.lock();
            let open: Vec<OrderId> = ledger.open.drain().collect();
            let mut count = 0;
            for id in open {
                let Some(order) = ledger.orders.get_mut(&id) else {
                    continue;
                };
                if order.transition(OrderStatus::Cancelled).is_ok() {
                    order.reason = Some("session closed".to_string());
                    count += 1;
                }
            }
            count
        };
        info!(cancelled, "Paper broker disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    async fn account_summary(&self) -> Result<AccountSummary, ExecutionError> {
        self.ensure_connected()?;
        Ok(self.inner.ledger.lock().account(&self.inner.config))
    }

    async fn subscribe_market_data(&self, symbol: &str) -> Result<MarketDataStream, ExecutionError> {
        self.ensure_connected()?;
        if !self.inner.instruments.contains_key(symbol) {
            return Err(ExecutionError::UnknownInstrument(symbol.to_string()));
        }
        info!(symbol, "Market data subscribed");
        Ok(self.inner.market_data.subscribe(symbol))
    }

    async fn unsubscribe_market_data(&self, symbol: &str) -> Result<(), ExecutionError> {
        if self.inner.market_data.unsubscribe(symbol) {
            info!(symbol, "Market data unsubscribed");
        }
        Ok(())
    }

    async fn place_order(&self, intent: OrderIntent) -> Result<OrderAck, ExecutionError> {
        self.ensure_connected()?;
        let ack = self.accept(&intent);

        if ack.is_rejected() {
            increment_counter(CounterMetric::OrdersRejected);
            warn!(
                client_order_id = %intent.client_order_id,
                reason = ack.reason.as_deref().unwrap_or(""),
                "Paper order rejected"
            );
        } else {
            increment_counter(CounterMetric::OrdersSubmitted);
            info!(
                order_id = %ack.order_id,
                client_order_id = %intent.client_order_id,
                symbol = %intent.symbol,
                side = ?intent.side,
                contracts = intent.contracts,
                "Paper order submitted"
            );
            self.spawn_fill_timer(ack.order_id);
        }
        Ok(ack)
    }

    async fn cancel_order(&self, id: OrderId) -> Result<(), ExecutionError> {
        self.ensure_connected()?;
        let mut ledger = self.inner.ledger.lock();
        let order = ledger
            .orders
            .get_mut(&id)
            .ok_or(ExecutionError::OrderNotFound(id))?;

        match order.transition(OrderStatus::Cancelled) {
            Ok(()) => {
                order.reason = Some("cancelled by client".to_string());
                ledger.close(&id);
                drop(ledger);
                info!(order_id = %id, "Paper order cancelled");
                Ok(())
            }
            Err(OrderStatus::Filled) => Err(ExecutionError::AlreadyFilled(id)),
            Err(status) => Err(ExecutionError::AlreadyTerminal { id, status }),
        }
    }

    async fn open_orders(&self) -> Result<Vec<Order>, ExecutionError> {
        self.ensure_connected()?;
        let ledger = self.inner.ledger.lock();
        let mut orders: Vec<Order> = ledger.open_orders().cloned().collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn position(&self, symbol: &str) -> Result<Option<Position>, ExecutionError> {
        self.ensure_connected()?;
        let position = self.inner.ledger.lock().positions.position(symbol);
        let Some(mut position) = position else {
            return Ok(None);
        };

        let mark = self.last_price(symbol);
        if let (Some(price), Some(instrument)) = (mark, self.inner.instruments.get(symbol)) {
            position.unrealized_pnl = position.pnl_at(price, instrument.point_value());
        }
        Ok(Some(position))
    }
}
