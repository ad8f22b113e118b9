//! Fixed-fractional contract sizing
//!
//! Contracts = floor(equity * risk_pct / (stop_ticks * tick_value)),
//! clamped to [0, max_contracts].

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Number of contracts that risks at most `risk_pct` of `equity`
///
/// Degenerate inputs (no stop, non-positive tick value or equity) size to
/// zero rather than erroring.
pub fn contracts_for_risk(
    equity: Decimal,
    risk_pct: Decimal,
    stop_ticks: u32,
    tick_value: Decimal,
    max_contracts: u32,
) -> u32 {
    if stop_ticks == 0 || tick_value <= Decimal::ZERO || equity <= Decimal::ZERO {
        return 0;
    }

    let risk_budget = equity * risk_pct;
    let risk_per_contract = Decimal::from(stop_ticks) * tick_value;
    let raw = (risk_budget / risk_per_contract).floor();

    if raw <= Decimal::ZERO {
        return 0;
    }
    raw.to_u32().unwrap_or(u32::MAX).min(max_contracts)
}
