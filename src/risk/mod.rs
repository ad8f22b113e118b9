//! Risk management module
//!
//! Drawdown tracking, the safe-mode kill switch, and contract sizing

mod engine;
mod sizing;
mod state;
mod types;

pub use engine::RiskEngine;
pub use sizing::contracts_for_risk;
pub use state::{RiskSnapshot, RiskState};
pub use types::{Authorization, EquityUpdate, RiskError};
