//! Trading engine orchestration
//!
//! Market event -> Calculator -> Strategy -> RiskEngine -> Broker, plus a
//! periodic loop that pulls account equity into the risk engine. The
//! engine never holds one of its locks across a broker or alert call.

use super::types::{CancelOutcome, EngineCounters};
use super::{EngineError, EngineState, EngineStats, ShutdownReport};
use crate::alert::{Alerter, Severity};
use crate::config::EngineConfig;
use crate::execution::{Broker, ExecutionError, Instrument, MarketDataStream, OrderIntent};
use crate::feed::MarketEvent;
use crate::indicators::Calculator;
use crate::risk::{RiskEngine, RiskSnapshot};
use crate::shutdown;
use crate::signal::{Signal, Strategy};
use crate::storage::{PersistedState, Repository};
use crate::telemetry::{increment_counter, CounterMetric};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Upper bound for a single alert delivery
const ALERT_TIMEOUT: Duration = Duration::from_secs(2);

/// Time the stop-time cancel sweep still gets after the loops were aborted
const CANCEL_SWEEP_FLOOR: Duration = Duration::from_millis(500);

/// Background tasks owned by a running engine
struct Workers {
    stop_tx: watch::Sender<bool>,
    event_loop: JoinHandle<()>,
    reconcile_loop: JoinHandle<()>,
}

/// State shared between the engine handle and its loops
struct Shared {
    config: EngineConfig,
    instrument: Instrument,
    broker: Arc<dyn Broker>,
    risk: Arc<RiskEngine>,
    alerter: Arc<dyn Alerter>,
    repository: Option<Arc<dyn Repository>>,
    calculator: Mutex<Box<dyn Calculator>>,
    strategy: Mutex<Box<dyn Strategy>>,
    state: Mutex<EngineState>,
    last_event: RwLock<Option<MarketEvent>>,
    counters: EngineCounters,
    order_seq: AtomicU64,
}

/// The trading bot
pub struct TradingEngine {
    shared: Arc<Shared>,
    workers: Mutex<Option<Workers>>,
}

impl TradingEngine {
    /// Create a stopped engine
    pub fn new(
        config: EngineConfig,
        instrument: Instrument,
        broker: Arc<dyn Broker>,
        risk: Arc<RiskEngine>,
        strategy: Box<dyn Strategy>,
        calculator: Box<dyn Calculator>,
        alerter: Arc<dyn Alerter>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                instrument,
                broker,
                risk,
                alerter,
                repository: None,
                calculator: Mutex::new(calculator),
                strategy: Mutex::new(strategy),
                state: Mutex::new(EngineState::Stopped),
                last_event: RwLock::new(None),
                counters: EngineCounters::default(),
                order_seq: AtomicU64::new(0),
            }),
            workers: Mutex::new(None),
        }
    }

    /// Persist risk state after each reconciliation and at stop
    ///
    /// Must be called before the engine is shared or started.
    pub fn with_repository(mut self, repository: Arc<dyn Repository>) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.repository = Some(repository);
        } else {
            warn!("Repository ignored: engine already shared");
        }
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        *self.shared.state.lock()
    }

    /// Most recent enriched bar
    pub fn last_event(&self) -> Option<MarketEvent> {
        self.shared.last_event.read().clone()
    }

    /// Counter snapshot
    pub fn stats(&self) -> EngineStats {
        self.shared.counters.snapshot()
    }

    /// The risk engine this bot sizes with
    pub fn risk(&self) -> &Arc<RiskEngine> {
        &self.shared.risk
    }

    /// Start trading with no external shutdown source
    pub async fn start(&self) -> Result<(), EngineError> {
        let (_never, external) = shutdown::channel();
        self.start_with_shutdown(external).await
    }

    /// Start trading; both loops also exit when `external` fires
    ///
    /// External shutdown leaves the state at `Running` until [`stop`] runs.
    ///
    /// [`stop`]: TradingEngine::stop
    pub async fn start_with_shutdown(
        &self,
        external: watch::Receiver<bool>,
    ) -> Result<(), EngineError> {
        {
            let mut state = self.shared.state.lock();
            if !state.can_start() {
                return Err(EngineError::AlreadyRunning(*state));
            }
            *state = EngineState::Starting;
        }

        let stream = match self.prepare().await {
            Ok(stream) => stream,
            Err(e) => {
                *self.shared.state.lock() = EngineState::Stopped;
                error!(error = %e, "Engine start failed");
                return Err(e);
            }
        };

        self.shared.strategy.lock().reset();

        let (stop_tx, stop_rx) = shutdown::channel();
        let event_loop = tokio::spawn(Shared::run_event_loop(
            Arc::clone(&self.shared),
            stream,
            stop_rx.clone(),
            external.clone(),
        ));
        let reconcile_loop = tokio::spawn(Shared::run_reconcile_loop(
            Arc::clone(&self.shared),
            stop_rx,
            external,
        ));
        *self.workers.lock() = Some(Workers {
            stop_tx,
            event_loop,
            reconcile_loop,
        });

        let strategy = self.shared.strategy.lock().name().to_string();
        self.shared
            .send_alert(
                Severity::Info,
                "bot started",
                &[
                    ("symbol", self.shared.config.symbol.clone()),
                    ("strategy", strategy),
                ],
            )
            .await;

        *self.shared.state.lock() = EngineState::Running;
        info!(symbol = %self.shared.config.symbol, "Engine running");
        Ok(())
    }

    async fn prepare(&self) -> Result<MarketDataStream, EngineError> {
        let broker = &self.shared.broker;
        if !broker.is_connected() {
            broker.connect().await.map_err(EngineError::Connect)?;
        }
        broker
            .subscribe_market_data(&self.shared.config.symbol)
            .await
            .map_err(EngineError::Subscribe)
    }

    /// Stop trading
    ///
    /// Signals both loops and waits for them within the grace period, then
    /// cancels every open order, alerts and returns to `Stopped`. Steps that
    /// fail or overrun are reported rather than aborting the shutdown.
    pub async fn stop(&self) -> Result<ShutdownReport, EngineError> {
        {
            let mut state = self.shared.state.lock();
            match *state {
                EngineState::Stopped => return Ok(ShutdownReport::default()),
                current if current.is_transitioning() => {
                    return Err(EngineError::Transitioning(current))
                }
                _ => *state = EngineState::Stopping,
            }
        }

        let started = Instant::now();
        let deadline = started + self.shared.config.shutdown_grace();
        let mut report = ShutdownReport {
            was_running: true,
            ..ShutdownReport::default()
        };
        info!("Engine stopping");

        let workers = self.workers.lock().take();
        if let Some(workers) = &workers {
            workers.stop_tx.send_replace(true);
        }

        // Join the loops before sweeping so an order placed mid-event is
        // already at the broker when open orders are listed
        if let Some(workers) = workers {
            let Workers {
                mut event_loop,
                mut reconcile_loop,
                ..
            } = workers;
            let joined = tokio::time::timeout_at(deadline, async {
                let _ = (&mut event_loop).await;
                let _ = (&mut reconcile_loop).await;
            })
            .await;
            if joined.is_err() {
                report.timed_out = true;
                warn!("Engine loops did not exit within grace period, aborting");
                event_loop.abort();
                reconcile_loop.abort();
            }
        }

        let sweep_deadline = if report.timed_out {
            Instant::now() + CANCEL_SWEEP_FLOOR
        } else {
            deadline
        };
        match tokio::time::timeout_at(sweep_deadline, self.shared.cancel_open_orders()).await {
            Ok(outcome) => {
                report.orders_cancelled = outcome.cancelled;
                report.cancel_failures = outcome.failed;
            }
            Err(_) => {
                report.timed_out = true;
                warn!("Timed out cancelling open orders during stop");
            }
        }

        if let Err(e) = self
            .shared
            .broker
            .unsubscribe_market_data(&self.shared.config.symbol)
            .await
        {
            warn!(error = %e, "Market data unsubscribe failed");
        }
        self.shared.persist(self.shared.risk.snapshot()).await;

        report.elapsed = started.elapsed();
        self.shared
            .send_alert(
                Severity::Info,
                "bot stopped",
                &[
                    ("symbol", self.shared.config.symbol.clone()),
                    ("orders_cancelled", report.orders_cancelled.to_string()),
                    ("timed_out", report.timed_out.to_string()),
                ],
            )
            .await;

        *self.shared.state.lock() = EngineState::Stopped;
        if report.timed_out {
            warn!(elapsed_ms = report.elapsed.as_millis() as u64, "Engine stopped after exceeding grace period");
        } else {
            info!(elapsed_ms = report.elapsed.as_millis() as u64, "Engine stopped");
        }
        Ok(report)
    }

    /// Run one reconciliation pass immediately
    pub async fn reconcile_now(&self) {
        self.shared.reconcile().await;
    }
}

impl Shared {
    async fn run_event_loop(
        shared: Arc<Shared>,
        mut stream: MarketDataStream,
        mut stop: watch::Receiver<bool>,
        mut external: watch::Receiver<bool>,
    ) {
        debug!(symbol = stream.symbol(), "Event loop started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown::requested(&mut stop) => break,
                _ = shutdown::requested(&mut external) => {
                    info!("Event loop observed external shutdown");
                    break;
                }
                event = stream.recv() => match event {
                    Some(event) => shared.handle_event(event).await,
                    None => {
                        warn!(symbol = stream.symbol(), "Market data stream closed");
                        break;
                    }
                },
            }
        }
        debug!("Event loop exited");
    }

    async fn run_reconcile_loop(
        shared: Arc<Shared>,
        mut stop: watch::Receiver<bool>,
        mut external: watch::Receiver<bool>,
    ) {
        let interval = shared.config.reconcile_interval();
        debug!(interval_ms = interval.as_millis() as u64, "Reconcile loop started");
        loop {
            // Sleep after each pass so reconciliations never overlap
            tokio::select! {
                biased;
                _ = shutdown::requested(&mut stop) => break,
                _ = shutdown::requested(&mut external) => {
                    info!("Reconcile loop observed external shutdown");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
            shared.reconcile().await;
        }
        debug!("Reconcile loop exited");
    }

    async fn handle_event(&self, event: MarketEvent) {
        let enriched = self.calculator.lock().enrich(event);
        *self.last_event.write() = Some(enriched.clone());
        EngineCounters::bump(&self.counters.events_processed);

        let signals = self.strategy.lock().process(&enriched);
        for signal in signals {
            self.handle_signal(signal, &enriched).await;
        }
    }

    async fn handle_signal(&self, signal: Signal, event: &MarketEvent) {
        EngineCounters::bump(&self.counters.signals_seen);

        if signal.symbol != self.config.symbol {
            warn!(signal_id = %signal.id, symbol = %signal.symbol, "Signal for untraded symbol ignored");
            return;
        }

        let equity = self.risk.snapshot().current_equity;
        let authorization = match self.risk.authorize_signal(
            &signal,
            signal.stop_ticks,
            equity,
            self.instrument.tick_value,
        ) {
            Ok(authorization) => authorization,
            Err(e) => {
                EngineCounters::bump(&self.counters.kill_switch_rejections);
                warn!(signal_id = %signal.id, strategy = %signal.strategy, error = %e, "Signal rejected");
                return;
            }
        };

        let (side, contracts) = match signal.direction.side() {
            Some(side) => {
                if !authorization.is_tradeable() {
                    EngineCounters::bump(&self.counters.zero_size_skips);
                    debug!(signal_id = %signal.id, stop_ticks = signal.stop_ticks, "Signal sized to zero, skipped");
                    return;
                }
                (side, authorization.contracts)
            }
            None => match self.broker.position(&signal.symbol).await {
                Ok(Some(position)) => (position.side.opposite(), position.contracts),
                Ok(None) => {
                    debug!(signal_id = %signal.id, "Flat signal with no position");
                    return;
                }
                Err(e) => {
                    warn!(signal_id = %signal.id, error = %e, "Position query failed, flat signal dropped");
                    return;
                }
            },
        };

        let intent = OrderIntent {
            client_order_id: self.next_client_order_id(&signal),
            symbol: signal.symbol.clone(),
            side,
            contracts,
            reference_price: event.close,
        };

        match self.broker.place_order(intent).await {
            Ok(ack) if ack.is_rejected() => {
                EngineCounters::bump(&self.counters.orders_rejected);
                let reason = ack.reason.unwrap_or_default();
                warn!(signal_id = %signal.id, client_order_id = %ack.client_order_id, %reason, "Order rejected by broker");
                if self.config.alert_on_rejection {
                    self.send_alert(
                        Severity::Warning,
                        "order rejected",
                        &[
                            ("client_order_id", ack.client_order_id),
                            ("reason", reason),
                        ],
                    )
                    .await;
                }
            }
            Ok(ack) => {
                // The latch may have been set while the order was in flight,
                // after the kill-switch sweep listed open orders
                if self.risk.is_in_safe_mode() {
                    match self.broker.cancel_order(ack.order_id).await {
                        Ok(()) => warn!(
                            signal_id = %signal.id,
                            order_id = %ack.order_id,
                            "Safe mode latched during placement, order cancelled"
                        ),
                        Err(e) => warn!(
                            signal_id = %signal.id,
                            order_id = %ack.order_id,
                            error = %e,
                            "Safe mode latched during placement, cancel failed"
                        ),
                    }
                    EngineCounters::bump(&self.counters.kill_switch_rejections);
                    return;
                }
                EngineCounters::bump(&self.counters.orders_submitted);
                info!(
                    signal_id = %signal.id,
                    order_id = %ack.order_id,
                    side = ?side,
                    contracts,
                    rationale = %signal.rationale,
                    "Order submitted"
                );
            }
            Err(e) => {
                EngineCounters::bump(&self.counters.order_errors);
                warn!(signal_id = %signal.id, error = %e, "Order placement failed");
            }
        }
    }

    fn next_client_order_id(&self, signal: &Signal) -> String {
        let seq = self.order_seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}-{}", signal.strategy, signal.id, seq)
    }

    async fn reconcile(&self) {
        let summary = match self.broker.account_summary().await {
            Ok(summary) => summary,
            Err(e) => {
                EngineCounters::bump(&self.counters.reconcile_failures);
                increment_counter(CounterMetric::ReconcileFailures);
                warn!(error = %e, "Account reconciliation failed");
                return;
            }
        };

        let update = self.risk.update_equity(summary.net_liquidation);
        EngineCounters::bump(&self.counters.reconciliations);
        debug!(
            equity = %update.snapshot.current_equity,
            peak = %update.snapshot.peak_equity,
            drawdown = %update.snapshot.drawdown,
            new_peak = update.new_peak,
            "Equity reconciled"
        );

        if update.safe_mode_triggered {
            let outcome = self.cancel_open_orders().await;
            self.send_alert(
                Severity::Critical,
                "KILL SWITCH activated: maximum drawdown breached, trading halted",
                &[
                    ("equity", update.snapshot.current_equity.to_string()),
                    ("peak_equity", update.snapshot.peak_equity.to_string()),
                    ("drawdown", update.snapshot.drawdown.to_string()),
                    ("orders_cancelled", outcome.cancelled.to_string()),
                ],
            )
            .await;
        }

        self.persist(update.snapshot).await;
    }

    /// Cancel every open order, best-effort
    async fn cancel_open_orders(&self) -> CancelOutcome {
        let mut outcome = CancelOutcome::default();
        let orders = match self.broker.open_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                warn!(error = %e, "Could not list open orders for cancellation");
                outcome.failed += 1;
                return outcome;
            }
        };

        for order in orders {
            match self.broker.cancel_order(order.id).await {
                Ok(()) => outcome.cancelled += 1,
                Err(ExecutionError::AlreadyFilled(_) | ExecutionError::AlreadyTerminal { .. }) => {
                    debug!(order_id = %order.id, "Order reached a terminal state before cancel");
                }
                Err(e) => {
                    outcome.failed += 1;
                    warn!(order_id = %order.id, error = %e, "Order cancel failed");
                }
            }
        }
        if outcome.cancelled > 0 || outcome.failed > 0 {
            info!(cancelled = outcome.cancelled, failed = outcome.failed, "Open orders cancelled");
        }
        outcome
    }

    async fn send_alert(&self, severity: Severity, message: &str, fields: &[(&str, String)]) {
        match tokio::time::timeout(ALERT_TIMEOUT, self.alerter.alert(severity, message, fields)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, %message, "Alert delivery failed"),
            Err(_) => warn!(%message, "Alert delivery timed out"),
        }
    }

    async fn persist(&self, snapshot: RiskSnapshot) {
        let Some(repository) = &self.repository else {
            return;
        };
        if let Err(e) = repository.save_state(&PersistedState::from(snapshot)).await {
            warn!(error = %e, "Risk state save failed");
        }
    }
}
