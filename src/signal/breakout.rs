//! Channel breakout strategy
//!
//! Goes long when a bar closes above the highest high of the previous
//! `lookback` bars and short when it closes below the lowest low. Only a
//! change of direction produces a new signal.

use super::{Direction, Signal, Strategy};
use crate::config::StrategyConfig;
use crate::feed::MarketEvent;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;

const NAME: &str = "breakout";

/// Breakout strategy parameters
#[derive(Debug, Clone)]
pub struct BreakoutConfig {
    /// Number of prior bars forming the channel
    pub lookback: usize,
    /// Stop distance as a multiple of ATR
    pub stop_atr_multiple: Decimal,
    /// Instrument tick size, used to express the stop in ticks
    pub tick_size: Decimal,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            stop_atr_multiple: dec!(2),
            tick_size: dec!(0.25),
        }
    }
}

impl BreakoutConfig {
    /// Build from the strategy section and the instrument tick size
    pub fn from_config(config: &StrategyConfig, tick_size: Decimal) -> Self {
        Self {
            lookback: config.lookback,
            stop_atr_multiple: config.stop_atr_multiple,
            tick_size,
        }
    }
}

/// Donchian-style breakout strategy
pub struct BreakoutStrategy {
    config: BreakoutConfig,
    /// (high, low) of the prior bars
    channel: VecDeque<(Decimal, Decimal)>,
    last_direction: Option<Direction>,
    sequence: u64,
}

impl BreakoutStrategy {
    /// Create a new breakout strategy
    pub fn new(config: BreakoutConfig) -> Self {
        let lookback = config.lookback.max(1);
        Self {
            config: BreakoutConfig { lookback, ..config },
            channel: VecDeque::with_capacity(lookback),
            last_direction: None,
            sequence: 0,
        }
    }

    fn stop_ticks(&self, atr: Decimal) -> u32 {
        if self.config.tick_size <= Decimal::ZERO {
            return 0;
        }
        let ticks = (self.config.stop_atr_multiple * atr / self.config.tick_size).ceil();
        ticks.to_u32().unwrap_or(u32::MAX).max(1)
    }

    fn remember(&mut self, event: &MarketEvent) {
        self.channel.push_back((event.high, event.low));
        while self.channel.len() > self.config.lookback {
            self.channel.pop_front();
        }
    }

    fn detect(&mut self, event: &MarketEvent) -> Option<Signal> {
        let atr = event.atr.filter(|a| *a > Decimal::ZERO)?;
        if self.channel.len() < self.config.lookback {
            return None;
        }

        let highest = self.channel.iter().map(|(h, _)| *h).max()?;
        let lowest = self.channel.iter().map(|(_, l)| *l).min()?;

        let (direction, distance, level) = if event.close > highest {
            (Direction::Long, event.close - highest, highest)
        } else if event.close < lowest {
            (Direction::Short, lowest - event.close, lowest)
        } else {
            return None;
        };

        if self.last_direction == Some(direction) {
            return None;
        }
        self.last_direction = Some(direction);
        self.sequence += 1;

        let strength = (distance / atr).min(Decimal::ONE);
        Some(Signal::new(
            format!("{}-{}", NAME, self.sequence),
            event.symbol.clone(),
            direction,
            self.stop_ticks(atr),
            strength,
            format!(
                "close {} broke {}-bar channel level {} (atr {})",
                event.close, self.config.lookback, level, atr
            ),
            NAME,
        ))
    }
}

impl Strategy for BreakoutStrategy {
    fn process(&mut self, event: &MarketEvent) -> Vec<Signal> {
        let signal = self.detect(event);
        self.remember(event);
        signal.into_iter().collect()
    }

    fn name(&self) -> &str {
        NAME
    }

    fn reset(&mut self) {
        self.channel.clear();
        self.last_direction = None;
    }
}
