//! Rolling ATR and close-price standard deviation

use super::Calculator;
use crate::feed::MarketEvent;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Average true range and standard deviation over a fixed bar window
pub struct AtrCalculator {
    /// Number of bars in the window
    period: usize,
    /// Most recent true ranges
    true_ranges: VecDeque<Decimal>,
    /// Most recent closes
    closes: VecDeque<Decimal>,
    /// Close of the previous bar
    prev_close: Option<Decimal>,
}

impl AtrCalculator {
    /// Create a calculator over `period` bars (minimum 1)
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            true_ranges: VecDeque::with_capacity(period),
            closes: VecDeque::with_capacity(period),
            prev_close: None,
        }
    }

    /// Window length
    pub fn period(&self) -> usize {
        self.period
    }

    fn true_range(&self, event: &MarketEvent) -> Decimal {
        let range = event.high - event.low;
        match self.prev_close {
            Some(prev) => range
                .max((event.high - prev).abs())
                .max((event.low - prev).abs()),
            None => range,
        }
    }

    fn push(window: &mut VecDeque<Decimal>, value: Decimal, period: usize) {
        window.push_back(value);
        while window.len() > period {
            window.pop_front();
        }
    }

    /// Current ATR, once the window is full
    pub fn atr(&self) -> Option<Decimal> {
        if self.true_ranges.len() < self.period {
            return None;
        }
        let sum: Decimal = self.true_ranges.iter().sum();
        Some(sum / Decimal::from(self.period))
    }

    /// Population standard deviation of closes, once the window is full
    pub fn std_dev(&self) -> Option<Decimal> {
        if self.closes.len() < self.period {
            return None;
        }

        let values: Vec<f64> = self
            .closes
            .iter()
            .map(|c| f64::try_from(*c).unwrap_or(0.0))
            .collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Decimal::try_from(variance.sqrt()).ok()
    }
}

impl Calculator for AtrCalculator {
    fn enrich(&mut self, event: MarketEvent) -> MarketEvent {
        let tr = self.true_range(&event);
        Self::push(&mut self.true_ranges, tr, self.period);
        Self::push(&mut self.closes, event.close, self.period);
        self.prev_close = Some(event.close);

        let atr = self.atr();
        let std_dev = self.std_dev();
        event.with_indicators(atr, std_dev)
    }
}
