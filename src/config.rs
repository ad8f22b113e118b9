//! Configuration types for futures-bot

use crate::execution::Instrument;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub engine: EngineConfig,
    pub instrument: Instrument,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Trading engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Symbol to trade
    pub symbol: String,

    /// Equity reconciliation interval (milliseconds)
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,

    /// Upper bound on a graceful stop (milliseconds)
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Send a warning alert when the broker rejects an order
    #[serde(default)]
    pub alert_on_rejection: bool,
}

fn default_reconcile_interval_ms() -> u64 {
    5_000
}
fn default_shutdown_grace_ms() -> u64 {
    10_000
}

impl EngineConfig {
    /// Config for `symbol` with default timings
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            alert_on_rejection: false,
        }
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Risk limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RiskConfig {
    /// Drawdown fraction that latches safe mode (inclusive)
    #[serde(default = "default_max_drawdown_pct")]
    pub max_drawdown_pct: Decimal,

    /// Fraction of equity risked per trade
    #[serde(default = "default_risk_per_trade_pct")]
    pub risk_per_trade_pct: Decimal,

    /// Contract cap per signal
    #[serde(default = "default_max_contracts")]
    pub max_contracts: u32,
}

fn default_max_drawdown_pct() -> Decimal {
    dec!(0.20)
}
fn default_risk_per_trade_pct() -> Decimal {
    dec!(0.01)
}
fn default_max_contracts() -> u32 {
    10
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_drawdown_pct: default_max_drawdown_pct(),
            risk_per_trade_pct: default_risk_per_trade_pct(),
            max_contracts: default_max_contracts(),
        }
    }
}

/// Paper broker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Account equity before any fills
    #[serde(default = "default_starting_equity")]
    pub starting_equity: Decimal,

    /// Delay between submission and fill (milliseconds)
    #[serde(default = "default_fill_delay_ms")]
    pub fill_delay_ms: u64,

    /// Adverse slippage applied to every fill, in ticks
    #[serde(default = "default_slippage_ticks")]
    pub slippage_ticks: u32,

    /// Commission per contract per side
    #[serde(default = "default_commission")]
    pub commission_per_contract: Decimal,

    /// Initial margin per contract; zero disables the check
    #[serde(default)]
    pub margin_per_contract: Decimal,

    /// Bars buffered per market data queue
    #[serde(default = "default_market_data_capacity")]
    pub market_data_capacity: usize,
}

fn default_starting_equity() -> Decimal {
    dec!(10000)
}
fn default_fill_delay_ms() -> u64 {
    250
}
fn default_slippage_ticks() -> u32 {
    1
}
fn default_commission() -> Decimal {
    dec!(0.62)
}
fn default_market_data_capacity() -> usize {
    1024
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            starting_equity: default_starting_equity(),
            fill_delay_ms: default_fill_delay_ms(),
            slippage_ticks: default_slippage_ticks(),
            commission_per_contract: default_commission(),
            margin_per_contract: Decimal::ZERO,
            market_data_capacity: default_market_data_capacity(),
        }
    }
}

impl ExecutionConfig {
    pub fn fill_delay(&self) -> Duration {
        Duration::from_millis(self.fill_delay_ms)
    }
}

/// Breakout strategy and indicator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Bars forming the breakout channel
    #[serde(default = "default_lookback")]
    pub lookback: usize,

    /// ATR window
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    /// Stop distance as a multiple of ATR
    #[serde(default = "default_stop_atr_multiple")]
    pub stop_atr_multiple: Decimal,
}

fn default_lookback() -> usize {
    20
}
fn default_atr_period() -> usize {
    14
}
fn default_stop_atr_multiple() -> Decimal {
    dec!(2)
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
            atr_period: default_atr_period(),
            stop_atr_multiple: default_stop_atr_multiple(),
        }
    }
}

/// State persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// JSON file holding equity, peak and safe mode
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./state/risk.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON log lines
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// The bundled example configuration, validated like a loaded file
    pub fn example() -> anyhow::Result<Self> {
        let config: Config = toml::from_str(include_str!("../config.toml.example"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.engine.symbol != self.instrument.symbol {
            anyhow::bail!(
                "engine symbol {} has no matching instrument (found {})",
                self.engine.symbol,
                self.instrument.symbol
            );
        }
        if self.instrument.tick_size <= Decimal::ZERO || self.instrument.tick_value <= Decimal::ZERO {
            anyhow::bail!("instrument tick size and tick value must be positive");
        }
        if self.risk.max_drawdown_pct <= Decimal::ZERO || self.risk.max_drawdown_pct > Decimal::ONE {
            anyhow::bail!("risk.max_drawdown_pct must be in (0, 1]");
        }
        if self.engine.reconcile_interval_ms == 0 {
            anyhow::bail!("engine.reconcile_interval_ms must be positive");
        }
        Ok(())
    }
}
