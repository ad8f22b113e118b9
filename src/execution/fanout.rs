//! Per-symbol market data distribution
//!
//! Each subscribed symbol owns one bounded broadcast queue. Publishing never
//! blocks: a consumer that falls behind loses the oldest undelivered bars
//! and is told how many it skipped.

use crate::feed::MarketEvent;
use crate::telemetry::{increment_counter_by, CounterMetric};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Receiving end of one symbol's queue
pub struct MarketDataStream {
    symbol: String,
    rx: broadcast::Receiver<MarketEvent>,
}

impl MarketDataStream {
    /// Wrap a receiver for `symbol`
    pub fn new(symbol: impl Into<String>, rx: broadcast::Receiver<MarketEvent>) -> Self {
        Self {
            symbol: symbol.into(),
            rx,
        }
    }

    /// Symbol this stream delivers
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Next bar in arrival order, or `None` once the queue is gone
    pub async fn recv(&mut self) -> Option<MarketEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(symbol = %self.symbol, skipped, "Market data consumer lagging, oldest bars dropped");
                    increment_counter_by(CounterMetric::MarketDataLagged, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Single-producer, multi-symbol price distributor
pub struct MarketDataHub {
    capacity: usize,
    queues: Mutex<HashMap<String, broadcast::Sender<MarketEvent>>>,
}

impl MarketDataHub {
    /// Create a hub whose queues hold `capacity` bars each
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Open a fresh queue for `symbol`, closing any previous one
    pub fn subscribe(&self, symbol: &str) -> MarketDataStream {
        let (tx, rx) = broadcast::channel(self.capacity);
        let previous = self.queues.lock().insert(symbol.to_string(), tx);
        if previous.is_some() {
            tracing::debug!(symbol, "Replaced existing market data subscription");
        }
        MarketDataStream::new(symbol, rx)
    }

    /// Close the queue for `symbol`; returns whether one existed
    pub fn unsubscribe(&self, symbol: &str) -> bool {
        self.queues.lock().remove(symbol).is_some()
    }

    /// Deliver a bar to its symbol's queue, returning the receiver count
    ///
    /// The queue handle is cloned out of the lock before sending, so a
    /// concurrent unsubscribe only affects later publishes.
    pub fn publish(&self, event: MarketEvent) -> usize {
        let sender = self.queues.lock().get(&event.symbol).cloned();
        match sender {
            Some(tx) => tx.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Whether `symbol` currently has a queue
    pub fn is_subscribed(&self, symbol: &str) -> bool {
        self.queues.lock().contains_key(symbol)
    }
}
