//! Market data feed module
//!
//! Bar types and a JSONL bar replay that drives the paper broker

mod replay;
mod types;

pub use replay::BarReplay;
pub use types::MarketEvent;
