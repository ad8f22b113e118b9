//! Metric recording through the `metrics` facade
//!
//! Calls are no-ops until a recorder is installed by the host process.

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Current equity
    Equity,
    /// High-water mark
    PeakEquity,
    /// Current drawdown fraction
    Drawdown,
    /// 1 while the kill switch is latched
    SafeMode,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Orders accepted by the broker
    OrdersSubmitted,
    /// Orders refused by the broker
    OrdersRejected,
    /// Orders filled
    OrdersFilled,
    /// Signals blocked by the kill switch
    KillSwitchRejections,
    /// Bars dropped for slow consumers
    MarketDataLagged,
    /// Failed account reconciliations
    ReconcileFailures,
}

fn gauge_name(metric: GaugeMetric) -> &'static str {
    match metric {
        GaugeMetric::Equity => "futuresbot_equity",
        GaugeMetric::PeakEquity => "futuresbot_peak_equity",
        GaugeMetric::Drawdown => "futuresbot_drawdown",
        GaugeMetric::SafeMode => "futuresbot_safe_mode",
    }
}

fn counter_name(metric: CounterMetric) -> &'static str {
    match metric {
        CounterMetric::OrdersSubmitted => "futuresbot_orders_submitted_total",
        CounterMetric::OrdersRejected => "futuresbot_orders_rejected_total",
        CounterMetric::OrdersFilled => "futuresbot_orders_filled_total",
        CounterMetric::KillSwitchRejections => "futuresbot_kill_switch_rejections_total",
        CounterMetric::MarketDataLagged => "futuresbot_market_data_lagged_total",
        CounterMetric::ReconcileFailures => "futuresbot_reconcile_failures_total",
    }
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    ::metrics::gauge!(gauge_name(metric)).set(value);
}

/// Increment a counter by one
pub fn increment_counter(metric: CounterMetric) {
    increment_counter_by(metric, 1);
}

/// Increment a counter by `n`
pub fn increment_counter_by(metric: CounterMetric, n: u64) {
    ::metrics::counter!(counter_name(metric)).increment(n);
}
