//! Risk management types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::RiskSnapshot;

/// Risk management errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RiskError {
    /// Safe mode is latched; no new orders may be authorized
    #[error("kill switch active: drawdown {drawdown} reached limit {limit}")]
    KillSwitchActive {
        /// Drawdown at the time of the rejection
        drawdown: Decimal,
        /// Configured maximum drawdown
        limit: Decimal,
    },
}

/// Result of sizing an authorized signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    /// Contracts to trade; zero means "do not trade"
    pub contracts: u32,
    /// Monetary risk of the sized position at the stop
    pub risk_amount: Decimal,
}

impl Authorization {
    /// Whether the caller should submit an order
    pub fn is_tradeable(&self) -> bool {
        self.contracts > 0
    }
}

/// Outcome of an equity update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquityUpdate {
    /// The value set a new high-water mark
    pub new_peak: bool,
    /// This call latched safe mode; alert exactly once on true
    pub safe_mode_triggered: bool,
    /// State after the update
    pub snapshot: RiskSnapshot,
}
