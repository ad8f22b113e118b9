//! Signal generation module
//!
//! Strategies turn enriched bars into trading signals

mod breakout;
mod types;

pub use breakout::{BreakoutConfig, BreakoutStrategy};
pub use types::{Direction, Side, Signal};

use crate::feed::MarketEvent;

/// Trait for trading strategy implementations
///
/// The engine drives a strategy from a single task, one bar at a time.
pub trait Strategy: Send {
    /// Process an enriched bar, returning zero or more signals
    fn process(&mut self, event: &MarketEvent) -> Vec<Signal>;
    /// Strategy name, used in signal attribution and logs
    fn name(&self) -> &str;
    /// Drop all accumulated state
    fn reset(&mut self);
}
