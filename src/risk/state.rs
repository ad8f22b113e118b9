//! Equity, high-water mark and safe-mode latch

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time view of risk state, taken under one lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSnapshot {
    /// Current equity
    pub current_equity: Decimal,
    /// High-water mark
    pub peak_equity: Decimal,
    /// (peak - current) / peak
    pub drawdown: Decimal,
    /// Kill switch latched
    pub safe_mode: bool,
}

/// Drawdown bookkeeping
///
/// `current_equity` and `peak_equity` only ever change together so that
/// `peak_equity >= current_equity` holds after every method returns.
#[derive(Debug, Clone)]
pub struct RiskState {
    current_equity: Decimal,
    peak_equity: Decimal,
    drawdown: Decimal,
    safe_mode: bool,
}

impl RiskState {
    /// Start at `initial_equity` with no drawdown
    pub fn new(initial_equity: Decimal) -> Self {
        Self {
            current_equity: initial_equity,
            peak_equity: initial_equity,
            drawdown: Decimal::ZERO,
            safe_mode: false,
        }
    }

    /// Record a new equity value, returning true on a new high-water mark
    pub fn apply_equity(&mut self, value: Decimal) -> bool {
        let new_peak = value > self.peak_equity;
        if new_peak {
            self.peak_equity = value;
        }
        self.current_equity = value;
        self.drawdown = Self::drawdown_of(self.peak_equity, self.current_equity);
        new_peak
    }

    /// Re-baseline to `equity`; the safe-mode latch is left untouched
    pub fn rebase(&mut self, equity: Decimal) {
        self.current_equity = equity;
        self.peak_equity = equity;
        self.drawdown = Decimal::ZERO;
    }

    /// Latch safe mode, returning true if it was not already set
    pub fn latch_safe_mode(&mut self) -> bool {
        let newly = !self.safe_mode;
        self.safe_mode = true;
        newly
    }

    /// Release the latch
    pub fn release_safe_mode(&mut self) {
        self.safe_mode = false;
    }

    /// Current drawdown fraction
    pub fn drawdown(&self) -> Decimal {
        self.drawdown
    }

    /// Whether the kill switch is latched
    pub fn is_safe_mode(&self) -> bool {
        self.safe_mode
    }

    /// Copy of every field
    pub fn snapshot(&self) -> RiskSnapshot {
        RiskSnapshot {
            current_equity: self.current_equity,
            peak_equity: self.peak_equity,
            drawdown: self.drawdown,
            safe_mode: self.safe_mode,
        }
    }

    fn drawdown_of(peak: Decimal, current: Decimal) -> Decimal {
        if peak <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (peak - current) / peak
    }
}
