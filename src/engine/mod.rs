//! Trading engine module
//!
//! Lifecycle state machine, market event loop and equity reconciliation

mod lifecycle;
mod trading;
mod types;

pub use lifecycle::EngineState;
pub use trading::TradingEngine;
pub use types::{EngineError, EngineStats, ShutdownReport};
