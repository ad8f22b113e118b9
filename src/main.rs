use clap::Parser;
use futures_bot::cli::{show_status, Cli, Commands};
use futures_bot::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {:#}", cli.config, e);
            eprintln!("Using example configuration");
            Config::example()?
        }
    };

    // Initialize telemetry
    futures_bot::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(symbol = %config.engine.symbol, "Starting paper trading");
            args.execute(&config).await?;
        }
        Commands::Status => show_status(&config).await?,
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Instrument: {} tick {} = {}",
                config.instrument.symbol, config.instrument.tick_size, config.instrument.tick_value
            );
            println!(
                "  Risk: MaxDrawdown={}%, RiskPerTrade={}%, MaxContracts={}",
                config.risk.max_drawdown_pct * rust_decimal_macros::dec!(100),
                config.risk.risk_per_trade_pct * rust_decimal_macros::dec!(100),
                config.risk.max_contracts
            );
            println!(
                "  Execution: equity={}, fill_delay={}ms, slippage={} ticks, commission={}",
                config.execution.starting_equity,
                config.execution.fill_delay_ms,
                config.execution.slippage_ticks,
                config.execution.commission_per_contract
            );
            println!(
                "  Strategy: lookback={}, atr_period={}, stop={}xATR",
                config.strategy.lookback,
                config.strategy.atr_period,
                config.strategy.stop_atr_multiple
            );
            println!("  State: {}", config.storage.state_path.display());
        }
    }

    Ok(())
}
