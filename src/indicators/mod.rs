//! Indicator module
//!
//! Enriches raw bars with volatility indicators before strategies see them

mod atr;

pub use atr::AtrCalculator;

use crate::feed::MarketEvent;

/// Trait for indicator calculators
///
/// Output is a pure function of the bars seen so far.
pub trait Calculator: Send {
    /// Feed a raw bar and return it with indicator fields filled in
    fn enrich(&mut self, event: MarketEvent) -> MarketEvent;
}
