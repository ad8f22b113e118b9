//! End-to-end integration tests

mod common;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use common::wait_for;
use futures_bot::alert::{RecordingAlerter, Severity};
use futures_bot::config::Config;
use futures_bot::engine::{EngineState, TradingEngine};
use futures_bot::execution::{Broker, PaperBroker};
use futures_bot::feed::{BarReplay, MarketEvent};
use futures_bot::indicators::AtrCalculator;
use futures_bot::risk::RiskEngine;
use futures_bot::shutdown;
use futures_bot::signal::{BreakoutConfig, BreakoutStrategy};
use futures_bot::storage::{JsonFileRepository, Repository};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const EXAMPLE: &str = include_str!("../../config.toml.example");

#[test]
fn test_config_example_loads() {
    let config: Config = toml::from_str(EXAMPLE).unwrap();
    config.validate().unwrap();
    assert_eq!(config.engine.symbol, "MES");
    assert_eq!(config.instrument.tick_value, dec!(1.25));
    assert_eq!(config.risk.max_drawdown_pct, dec!(0.20));

    let loaded = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example")).unwrap();
    assert_eq!(loaded.execution.margin_per_contract, dec!(1500));
}

/// Quiet range around 5000, a rally, then a collapse through the range
fn scenario() -> Vec<MarketEvent> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
    let mut closes = vec![dec!(5000); 10];
    closes.extend((1..=6).map(|i| dec!(5000) + Decimal::from(i * 2)));
    closes.extend((1..=6).map(|i| dec!(5012) - Decimal::from(i * 4)));

    closes
        .into_iter()
        .enumerate()
        .map(|(i, close)| {
            MarketEvent::new(
                "MES",
                start + ChronoDuration::minutes(i as i64),
                close,
                close + dec!(1),
                close - dec!(1),
                close,
                dec!(100),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_replay_through_engine() {
    let dir = tempfile::tempdir().unwrap();
    let bars_path = dir.path().join("bars.jsonl");
    {
        let mut file = std::fs::File::create(&bars_path).unwrap();
        for bar in scenario() {
            writeln!(file, "{}", serde_json::to_string(&bar).unwrap()).unwrap();
        }
    }

    let mut config: Config = toml::from_str(EXAMPLE).unwrap();
    config.execution.fill_delay_ms = 5;
    config.strategy.lookback = 5;
    config.strategy.atr_period = 3;
    config.storage.state_path = dir.path().join("risk.json");

    let broker = PaperBroker::new(config.execution.clone(), vec![config.instrument.clone()]);
    let risk = Arc::new(RiskEngine::new(
        config.risk.clone(),
        config.execution.starting_equity,
    ));
    let repository = Arc::new(JsonFileRepository::new(&config.storage.state_path));
    let alerter = Arc::new(RecordingAlerter::new());
    let engine = TradingEngine::new(
        config.engine.clone(),
        config.instrument.clone(),
        Arc::new(broker.clone()),
        Arc::clone(&risk),
        Box::new(BreakoutStrategy::new(BreakoutConfig::from_config(
            &config.strategy,
            config.instrument.tick_size,
        ))),
        Box::new(AtrCalculator::new(config.strategy.atr_period)),
        alerter.clone(),
    )
    .with_repository(repository.clone());

    let (_tx, rx) = shutdown::channel();
    engine.start_with_shutdown(rx.clone()).await.unwrap();

    let replay = BarReplay::from_file(&bars_path, Duration::from_millis(2))
        .await
        .unwrap();
    let total = replay.len() as u64;
    assert_eq!(replay.run(broker.clone(), rx).await as u64, total);

    assert!(wait_for(Duration::from_secs(2), || engine.stats().events_processed == total).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.reconcile_now().await;

    let stats = engine.stats();
    assert_eq!(stats.signals_seen, 2);
    assert_eq!(stats.orders_submitted, 2);
    assert_eq!(broker.fills().len(), 2);
    assert!(engine.last_event().unwrap().atr.is_some());

    let report = engine.stop().await.unwrap();
    assert!(!report.timed_out);
    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(alerter.count_matching(Severity::Info, "bot started"), 1);

    let account = broker.account_summary().await.unwrap();
    let saved = repository.get_state().await.unwrap().unwrap();
    assert_eq!(saved.equity, account.net_liquidation);
    assert_eq!(saved.safe_mode, risk.is_in_safe_mode());
}
