//! Engine types

use super::EngineState;
use crate::execution::ExecutionError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// `start` called while not stopped
    #[error("engine already running (state: {0})")]
    AlreadyRunning(EngineState),
    /// `stop` called while a start or stop is in progress
    #[error("engine is {0}, try again once the transition completes")]
    Transitioning(EngineState),
    /// Broker session could not be opened
    #[error("broker connect failed: {0}")]
    Connect(#[source] ExecutionError),
    /// Market data subscription failed
    #[error("market data subscription failed: {0}")]
    Subscribe(#[source] ExecutionError),
}

/// What a call to `stop` did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// The engine was running when `stop` was called
    pub was_running: bool,
    /// Open orders cancelled at the broker
    pub orders_cancelled: usize,
    /// Cancels that failed for reasons other than losing a race to a fill
    pub cancel_failures: usize,
    /// The grace period elapsed before every step finished
    pub timed_out: bool,
    /// Wall time spent stopping
    pub elapsed: Duration,
}

/// Outcome of cancelling every open order
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CancelOutcome {
    pub cancelled: usize,
    pub failed: usize,
}

/// Point-in-time engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Bars taken off the market data stream
    pub events_processed: u64,
    /// Signals returned by the strategy
    pub signals_seen: u64,
    /// Signals refused because safe mode was latched, including orders
    /// cancelled when the latch was set during placement
    pub kill_switch_rejections: u64,
    /// Signals sized to zero contracts
    pub zero_size_skips: u64,
    /// Orders the broker accepted
    pub orders_submitted: u64,
    /// Orders the broker refused
    pub orders_rejected: u64,
    /// Placement calls that failed outright
    pub order_errors: u64,
    /// Successful equity reconciliations
    pub reconciliations: u64,
    /// Failed account queries
    pub reconcile_failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    pub events_processed: AtomicU64,
    pub signals_seen: AtomicU64,
    pub kill_switch_rejections: AtomicU64,
    pub zero_size_skips: AtomicU64,
    pub orders_submitted: AtomicU64,
    pub orders_rejected: AtomicU64,
    pub order_errors: AtomicU64,
    pub reconciliations: AtomicU64,
    pub reconcile_failures: AtomicU64,
}

impl EngineCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineStats {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        EngineStats {
            events_processed: get(&self.events_processed),
            signals_seen: get(&self.signals_seen),
            kill_switch_rejections: get(&self.kill_switch_rejections),
            zero_size_skips: get(&self.zero_size_skips),
            orders_submitted: get(&self.orders_submitted),
            orders_rejected: get(&self.orders_rejected),
            order_errors: get(&self.order_errors),
            reconciliations: get(&self.reconciliations),
            reconcile_failures: get(&self.reconcile_failures),
        }
    }
}
