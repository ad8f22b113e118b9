//! Run command implementation

use crate::alert::LogAlerter;
use crate::config::Config;
use crate::engine::TradingEngine;
use crate::execution::{Broker, PaperBroker};
use crate::feed::BarReplay;
use crate::indicators::AtrCalculator;
use crate::risk::RiskEngine;
use crate::shutdown;
use crate::signal::{BreakoutConfig, BreakoutStrategy};
use crate::storage::{JsonFileRepository, Repository};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON-lines file of bars to replay
    #[arg(short, long)]
    pub bars: PathBuf,

    /// Delay between replayed bars (milliseconds)
    #[arg(long, default_value_t = 100)]
    pub pace_ms: u64,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let broker = PaperBroker::new(config.execution.clone(), vec![config.instrument.clone()]);
        let risk = Arc::new(RiskEngine::new(
            config.risk.clone(),
            config.execution.starting_equity,
        ));

        let repository = Arc::new(JsonFileRepository::new(&config.storage.state_path));
        match repository.get_state().await {
            Ok(Some(state)) => {
                risk.recover(&state);
            }
            Ok(None) => info!("No saved risk state, starting fresh"),
            Err(e) => warn!(error = %e, "Saved risk state unreadable, starting fresh"),
        }

        let replay =
            BarReplay::from_file(&self.bars, Duration::from_millis(self.pace_ms)).await?;

        let strategy = BreakoutStrategy::new(BreakoutConfig::from_config(
            &config.strategy,
            config.instrument.tick_size,
        ));
        let engine = TradingEngine::new(
            config.engine.clone(),
            config.instrument.clone(),
            Arc::new(broker.clone()),
            Arc::clone(&risk),
            Box::new(strategy),
            Box::new(AtrCalculator::new(config.strategy.atr_period)),
            Arc::new(LogAlerter),
        )
        .with_repository(repository);

        let (shutdown_tx, shutdown_rx) = shutdown::channel();
        engine.start_with_shutdown(shutdown_rx.clone()).await?;

        let mut replay_task = tokio::spawn(replay.run(broker.clone(), shutdown_rx));
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Ctrl-C handler failed");
                }
                info!("Interrupt received, shutting down");
                shutdown_tx.send_replace(true);
                let _ = (&mut replay_task).await;
            }
            published = &mut replay_task => {
                info!(bars = published.unwrap_or_default(), "Bar file exhausted");
                // Let in-flight fills land before the final equity pass
                tokio::time::sleep(config.execution.fill_delay() + Duration::from_millis(50)).await;
                engine.reconcile_now().await;
            }
        }

        let report = engine.stop().await?;
        let stats = engine.stats();
        let risk_snapshot = risk.snapshot();
        let account = broker.account_summary().await?;
        let trades = broker.trades();
        let wins = trades.iter().filter(|t| t.is_win()).count();
        broker.disconnect().await?;

        println!("Run complete");
        println!("  Bars processed: {}", stats.events_processed);
        println!("  Signals: {}", stats.signals_seen);
        println!(
            "  Orders: {} submitted, {} rejected, {} blocked by kill switch",
            stats.orders_submitted, stats.orders_rejected, stats.kill_switch_rejections
        );
        println!("  Trades: {} ({} winners)", trades.len(), wins);
        println!("  Realized PnL: {}", account.realized_pnl);
        println!("  Commissions: {}", account.commissions);
        println!("  Net liquidation: {}", account.net_liquidation);
        println!(
            "  Peak equity: {}  Drawdown: {:.2}%",
            risk_snapshot.peak_equity,
            risk_snapshot.drawdown * rust_decimal_macros::dec!(100)
        );
        if risk_snapshot.safe_mode {
            println!("  SAFE MODE ACTIVE: trading halted by kill switch");
        }
        if report.timed_out {
            println!("  Shutdown exceeded grace period");
        }
        Ok(())
    }
}
