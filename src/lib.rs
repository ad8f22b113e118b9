//! futures-bot: futures trading bot with a drawdown kill switch
//!
//! This library provides the core components for:
//! - Risk management: drawdown tracking, safe-mode latch, contract sizing
//! - Paper execution with delayed fills, slippage and commission
//! - Per-symbol market data fan-out
//! - Trading engine lifecycle and event loop
//! - ATR indicators and a breakout strategy
//! - Risk state persistence and alerting
//! - Structured logging and metrics

pub mod alert;
pub mod cli;
pub mod config;
pub mod engine;
pub mod execution;
pub mod feed;
pub mod indicators;
pub mod risk;
pub mod shutdown;
pub mod signal;
pub mod storage;
pub mod telemetry;
