//! Bar replay from JSON-lines files

use super::MarketEvent;
use crate::execution::PaperBroker;
use crate::shutdown;
use anyhow::Context;
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Replays recorded bars into a [`PaperBroker`] at a fixed pace
#[derive(Debug, Clone)]
pub struct BarReplay {
    bars: Vec<MarketEvent>,
    pace: Duration,
}

impl BarReplay {
    /// Build a replay from bars already in memory
    pub fn from_bars(bars: Vec<MarketEvent>, pace: Duration) -> Self {
        Self { bars, pace }
    }

    /// Load bars from a file with one JSON object per line
    ///
    /// Blank lines are skipped. A malformed line fails the whole load with
    /// its line number.
    pub async fn from_file(path: impl AsRef<Path>, pace: Duration) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading bars from {}", path.display()))?;

        let mut bars = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let bar: MarketEvent = serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid bar", path.display(), idx + 1))?;
            bars.push(bar);
        }
        info!(path = %path.display(), bars = bars.len(), "Loaded bar file");
        Ok(Self { bars, pace })
    }

    /// Number of bars queued
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// True if there is nothing to replay
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Publish every bar to the broker, pausing `pace` after each one
    ///
    /// Returns the number of bars published. Stops early on shutdown.
    pub async fn run(self, broker: PaperBroker, mut stop: watch::Receiver<bool>) -> usize {
        let mut published = 0;
        for bar in self.bars {
            if shutdown::is_requested(&stop) {
                break;
            }
            let receivers = broker.publish(bar);
            published += 1;
            debug!(published, receivers, "Replayed bar");

            if !self.pace.is_zero() {
                tokio::select! {
                    biased;
                    _ = shutdown::requested(&mut stop) => break,
                    _ = tokio::time::sleep(self.pace) => {}
                }
            }
        }
        info!(published, "Replay finished");
        published
    }
}
