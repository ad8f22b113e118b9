//! Concurrency-safe risk engine
//!
//! Sole owner of [`RiskState`]. Every read and write goes through one
//! mutex so callers never observe `current` and `peak` out of step.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::sizing::contracts_for_risk;
use super::{Authorization, EquityUpdate, RiskError, RiskSnapshot, RiskState};
use crate::config::RiskConfig;
use crate::signal::Signal;
use crate::storage::PersistedState;
use crate::telemetry::{increment_counter, set_gauge, CounterMetric, GaugeMetric};

/// Drawdown tracking, kill switch and position sizing
pub struct RiskEngine {
    config: RiskConfig,
    state: Mutex<RiskState>,
}

impl RiskEngine {
    /// Create a risk engine starting at `initial_equity`
    pub fn new(config: RiskConfig, initial_equity: Decimal) -> Self {
        Self {
            config,
            state: Mutex::new(RiskState::new(initial_equity)),
        }
    }

    /// Configured limits
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Record a reconciled equity value
    ///
    /// Latches safe mode when drawdown reaches the configured maximum
    /// (inclusive). `safe_mode_triggered` is true only for the call that
    /// flipped the latch.
    pub fn update_equity(&self, value: Decimal) -> EquityUpdate {
        let (new_peak, safe_mode_triggered, snapshot) = {
            let mut state = self.state.lock();
            let new_peak = state.apply_equity(value);
            let triggered = if state.drawdown() >= self.config.max_drawdown_pct {
                state.latch_safe_mode()
            } else {
                false
            };
            (new_peak, triggered, state.snapshot())
        };

        record_gauges(&snapshot);
        if safe_mode_triggered {
            warn!(
                equity = %snapshot.current_equity,
                peak = %snapshot.peak_equity,
                drawdown = %snapshot.drawdown,
                limit = %self.config.max_drawdown_pct,
                "Maximum drawdown breached, safe mode latched"
            );
        }

        EquityUpdate {
            new_peak,
            safe_mode_triggered,
            snapshot,
        }
    }

    /// Current equity, peak and drawdown read together
    pub fn snapshot(&self) -> RiskSnapshot {
        self.state.lock().snapshot()
    }

    /// Whether the kill switch is latched
    pub fn is_in_safe_mode(&self) -> bool {
        self.state.lock().is_safe_mode()
    }

    /// Authorize and size a signal
    ///
    /// Fails only when safe mode is active. A zero-contract authorization is
    /// a normal result meaning the stop is too wide for the risk budget.
    pub fn authorize_signal(
        &self,
        signal: &Signal,
        stop_ticks: u32,
        equity: Decimal,
        tick_value: Decimal,
    ) -> Result<Authorization, RiskError> {
        let snapshot = self.snapshot();
        if snapshot.safe_mode {
            increment_counter(CounterMetric::KillSwitchRejections);
            return Err(RiskError::KillSwitchActive {
                drawdown: snapshot.drawdown,
                limit: self.config.max_drawdown_pct,
            });
        }

        let contracts = contracts_for_risk(
            equity,
            self.config.risk_per_trade_pct,
            stop_ticks,
            tick_value,
            self.config.max_contracts,
        );
        let risk_amount = Decimal::from(contracts) * Decimal::from(stop_ticks) * tick_value;

        tracing::debug!(
            signal_id = %signal.id,
            symbol = %signal.symbol,
            stop_ticks,
            %equity,
            contracts,
            "Signal sized"
        );

        Ok(Authorization {
            contracts,
            risk_amount,
        })
    }

    /// Re-baseline equity and peak to `new_equity`
    ///
    /// Safe mode is deliberately left as it is.
    pub fn reset(&self, new_equity: Decimal) {
        let snapshot = {
            let mut state = self.state.lock();
            state.rebase(new_equity);
            state.snapshot()
        };
        info!(equity = %new_equity, safe_mode = snapshot.safe_mode, "Risk state reset");
        record_gauges(&snapshot);
    }

    /// Latch safe mode explicitly, returning true if it was not already set
    pub fn activate_safe_mode(&self) -> bool {
        let newly = self.state.lock().latch_safe_mode();
        if newly {
            warn!("Safe mode activated explicitly");
            set_gauge(GaugeMetric::SafeMode, 1.0);
        }
        newly
    }

    /// Administrative release of the kill switch
    ///
    /// Never invoked by the engine itself.
    pub fn clear_safe_mode(&self) {
        self.state.lock().release_safe_mode();
        warn!("Safe mode cleared by operator");
        set_gauge(GaugeMetric::SafeMode, 0.0);
    }

    /// Restore state persisted by a previous process
    pub fn recover(&self, persisted: &PersistedState) -> EquityUpdate {
        self.reset(persisted.peak_equity);
        if persisted.safe_mode {
            self.activate_safe_mode();
        }
        let update = self.update_equity(persisted.equity);
        info!(
            equity = %update.snapshot.current_equity,
            peak = %update.snapshot.peak_equity,
            safe_mode = update.snapshot.safe_mode,
            "Risk state recovered"
        );
        update
    }
}

fn record_gauges(snapshot: &RiskSnapshot) {
    use rust_decimal::prelude::ToPrimitive;

    set_gauge(
        GaugeMetric::Equity,
        snapshot.current_equity.to_f64().unwrap_or_default(),
    );
    set_gauge(
        GaugeMetric::PeakEquity,
        snapshot.peak_equity.to_f64().unwrap_or_default(),
    );
    set_gauge(
        GaugeMetric::Drawdown,
        snapshot.drawdown.to_f64().unwrap_or_default(),
    );
    set_gauge(
        GaugeMetric::SafeMode,
        if snapshot.safe_mode { 1.0 } else { 0.0 },
    );
}
