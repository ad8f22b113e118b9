//! Paper broker integration tests

mod common;

use common::*;
use futures_bot::execution::{Broker, ExecutionError, OrderIntent, OrderStatus, PaperBroker};
use futures_bot::signal::Side;
use rust_decimal_macros::dec;
use std::time::Duration;
use tokio_test::assert_ok;

const WAIT: Duration = Duration::from_secs(2);

fn intent(id: &str, side: Side, contracts: u32) -> OrderIntent {
    OrderIntent {
        client_order_id: id.to_string(),
        symbol: "MES".to_string(),
        side,
        contracts,
        reference_price: dec!(5000),
    }
}

async fn connected(fill_delay_ms: u64) -> PaperBroker {
    let broker = paper_broker(fill_delay_ms);
    assert_ok!(broker.connect().await);
    broker
}

#[tokio::test]
async fn test_round_trip_profit() {
    let broker = connected(10).await;
    broker.publish(bar(dec!(5000)));

    broker.place_order(intent("open", Side::Long, 2)).await.unwrap();
    assert!(wait_for(WAIT, || broker.fills().len() == 1).await);

    // Long fills one tick above the last price
    let position = broker.position("MES").await.unwrap().unwrap();
    assert_eq!(position.avg_entry_price, dec!(5000.25));
    assert_eq!(position.contracts, 2);

    broker.publish(bar(dec!(5010)));
    broker.place_order(intent("close", Side::Short, 2)).await.unwrap();
    assert!(wait_for(WAIT, || broker.fills().len() == 2).await);

    // Exit 5009.75: (5009.75 - 5000.25) * 2 * 5 = 95
    let trades = broker.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].realized_pnl, dec!(95));
    assert!(trades[0].is_win());

    let account = broker.account_summary().await.unwrap();
    assert_eq!(account.realized_pnl, dec!(95));
    assert_eq!(account.commissions, dec!(2.48));
    assert_eq!(account.net_liquidation, dec!(10092.52));
    assert!(broker.position("MES").await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancel_before_fill_wins() {
    let broker = connected(100).await;
    broker.publish(bar(dec!(5000)));

    let ack = broker.place_order(intent("c1", Side::Long, 1)).await.unwrap();
    assert_eq!(ack.status, OrderStatus::Submitted);
    assert_ok!(broker.cancel_order(ack.order_id).await);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(broker.fills().is_empty());
    assert_eq!(broker.order(ack.order_id).unwrap().status, OrderStatus::Cancelled);
    assert!(broker.position("MES").await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancel_after_fill_reports_filled() {
    let broker = connected(5).await;
    broker.publish(bar(dec!(5000)));

    let ack = broker.place_order(intent("f1", Side::Short, 1)).await.unwrap();
    assert!(wait_for(WAIT, || broker.fills().len() == 1).await);

    let err = broker.cancel_order(ack.order_id).await.unwrap_err();
    assert_eq!(err, ExecutionError::AlreadyFilled(ack.order_id));
}

#[tokio::test]
async fn test_fill_or_cancel_exactly_once_under_race() {
    let broker = connected(20).await;
    broker.publish(bar(dec!(5000)));

    let mut acks = Vec::new();
    for i in 0..50 {
        let side = if i % 2 == 0 { Side::Long } else { Side::Short };
        acks.push(
            broker
                .place_order(intent(&format!("race-{i}"), side, 1))
                .await
                .unwrap(),
        );
    }
    tokio::time::sleep(Duration::from_millis(18)).await;

    let mut cancelled = 0;
    for ack in &acks {
        if broker.cancel_order(ack.order_id).await.is_ok() {
            cancelled += 1;
        }
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let filled = broker.fills().len();
    assert_eq!(filled + cancelled, acks.len());
    for ack in &acks {
        let status = broker.order(ack.order_id).unwrap().status;
        assert!(matches!(status, OrderStatus::Filled | OrderStatus::Cancelled));
    }
}

#[tokio::test]
async fn test_no_price_rejects_at_fill_time() {
    let broker = connected(5).await;
    let ack = broker.place_order(intent("np", Side::Long, 1)).await.unwrap();
    assert_eq!(ack.status, OrderStatus::Submitted);

    assert!(
        wait_for(WAIT, || broker.order(ack.order_id).unwrap().status == OrderStatus::Rejected)
            .await
    );
    let order = broker.order(ack.order_id).unwrap();
    assert_eq!(order.reason.as_deref(), Some("no market price"));
    assert!(broker.fills().is_empty());
}

#[tokio::test]
async fn test_duplicate_client_id_rejected() {
    let broker = connected(1_000).await;
    broker.publish(bar(dec!(5000)));

    let first = broker.place_order(intent("dup", Side::Long, 1)).await.unwrap();
    assert!(!first.is_rejected());
    let second = broker.place_order(intent("dup", Side::Long, 1)).await.unwrap();
    assert!(second.is_rejected());
    assert_eq!(broker.open_orders().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_disconnected_broker_refuses_orders() {
    let broker = paper_broker(10);
    let err = broker
        .place_order(intent("x", Side::Long, 1))
        .await
        .unwrap_err();
    assert_eq!(err, ExecutionError::NotConnected);
    assert!(broker.account_summary().await.is_err());
}

#[tokio::test]
async fn test_disconnect_cancels_pending_orders() {
    let broker = connected(1_000).await;
    broker.publish(bar(dec!(5000)));
    let ack = broker.place_order(intent("p", Side::Long, 1)).await.unwrap();

    assert_ok!(broker.disconnect().await);
    let order = broker.order(ack.order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.reason.as_deref(), Some("session closed"));
}

#[tokio::test]
async fn test_fanout_is_per_symbol() {
    let broker = PaperBroker::new(
        execution_config(10),
        vec![
            mes(),
            futures_bot::execution::Instrument {
                symbol: "MNQ".to_string(),
                tick_size: dec!(0.25),
                tick_value: dec!(0.5),
            },
        ],
    );
    broker.connect().await.unwrap();
    let mut mes_stream = broker.subscribe_market_data("MES").await.unwrap();
    let mut mnq_stream = broker.subscribe_market_data("MNQ").await.unwrap();

    broker.publish(bar(dec!(5000)));
    broker.publish(futures_bot::feed::MarketEvent::flat("MNQ", dec!(18000)));

    assert_eq!(mes_stream.recv().await.unwrap().close, dec!(5000));
    assert_eq!(mnq_stream.recv().await.unwrap().close, dec!(18000));

    assert!(matches!(
        broker.subscribe_market_data("ES").await,
        Err(ExecutionError::UnknownInstrument(_))
    ));
}
