//! Risk engine integration tests

use futures_bot::config::RiskConfig;
use futures_bot::risk::{RiskEngine, RiskError};
use futures_bot::signal::{Direction, Signal};
use futures_bot::storage::PersistedState;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::thread;

fn engine(equity: Decimal) -> RiskEngine {
    RiskEngine::new(RiskConfig::default(), equity)
}

fn long_signal() -> Signal {
    Signal::new("s", "MES", Direction::Long, 8, dec!(1), "", "test")
}

#[test]
fn test_concurrent_updates_keep_equity_below_peak() {
    let risk = Arc::new(engine(dec!(10000)));
    let handles: Vec<_> = (0..100)
        .map(|writer| {
            let risk = Arc::clone(&risk);
            thread::spawn(move || {
                for step in 0..100 {
                    let value = dec!(9000) + Decimal::from((writer * 37 + step * 13) % 2000);
                    let update = risk.update_equity(value);
                    let s = update.snapshot;
                    assert!(s.current_equity <= s.peak_equity);
                    assert!(s.drawdown >= Decimal::ZERO && s.drawdown <= Decimal::ONE);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = risk.snapshot();
    assert!(snapshot.current_equity <= snapshot.peak_equity);
    assert!(snapshot.peak_equity <= dec!(11000));
}

#[test]
fn test_drawdown_exactly_at_limit_latches() {
    let risk = engine(dec!(10000));
    let update = risk.update_equity(dec!(8000));
    assert!(update.safe_mode_triggered);
    assert_eq!(update.snapshot.drawdown, dec!(0.2));
    assert!(risk.is_in_safe_mode());
}

#[test]
fn test_drawdown_just_past_limit_latches() {
    let risk = engine(dec!(10000));
    let update = risk.update_equity(dec!(7999.99));
    assert!(update.safe_mode_triggered);
}

#[test]
fn test_drawdown_just_under_limit_does_not_latch() {
    let risk = engine(dec!(10000));
    let update = risk.update_equity(dec!(8000.01));
    assert!(!update.safe_mode_triggered);
    assert!(!risk.is_in_safe_mode());
}

#[test]
fn test_recovery_does_not_release_safe_mode() {
    let risk = engine(dec!(10000));
    risk.update_equity(dec!(7500));
    assert!(risk.is_in_safe_mode());

    let update = risk.update_equity(dec!(8500));
    assert!(!update.safe_mode_triggered);
    assert!(risk.is_in_safe_mode());

    // Even a new high leaves the latch set
    risk.update_equity(dec!(12000));
    assert!(risk.is_in_safe_mode());
    assert!(matches!(
        risk.authorize_signal(&long_signal(), 8, dec!(12000), dec!(1.25)),
        Err(RiskError::KillSwitchActive { .. })
    ));
}

#[test]
fn test_only_one_transition_reported_under_contention() {
    let risk = Arc::new(engine(dec!(10000)));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let risk = Arc::clone(&risk);
            thread::spawn(move || risk.update_equity(dec!(7000)).safe_mode_triggered)
        })
        .collect();
    let triggered = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|t| *t)
        .count();
    assert_eq!(triggered, 1);
}

#[test]
fn test_sizing_follows_equity_and_cap() {
    let risk = engine(dec!(10000));
    let auth = risk
        .authorize_signal(&long_signal(), 8, dec!(10000), dec!(1.25))
        .unwrap();
    assert_eq!(auth.contracts, 10);
    assert_eq!(auth.risk_amount, dec!(100));

    let auth = risk
        .authorize_signal(&long_signal(), 20, dec!(10000), dec!(1.25))
        .unwrap();
    assert_eq!(auth.contracts, 4);

    let auth = risk
        .authorize_signal(&long_signal(), 1, dec!(1000000), dec!(1.25))
        .unwrap();
    assert_eq!(auth.contracts, 10);
}

#[test]
fn test_recover_restores_latch_and_peak() {
    let risk = engine(dec!(10000));
    let update = risk.recover(&PersistedState {
        equity: dec!(9000),
        peak_equity: dec!(15000),
        safe_mode: true,
        saved_at: chrono::Utc::now(),
    });
    assert_eq!(update.snapshot.peak_equity, dec!(15000));
    assert_eq!(update.snapshot.current_equity, dec!(9000));
    assert!(risk.is_in_safe_mode());

    risk.clear_safe_mode();
    assert!(!risk.is_in_safe_mode());
}
