//! CLI interface for futures-bot
//!
//! Provides subcommands for:
//! - `run`: Paper trade over a recorded bar file
//! - `status`: Show persisted risk state
//! - `config`: Show configuration

mod run;
mod status;

pub use run::RunArgs;
pub use status::show_status;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "futures-bot")]
#[command(about = "Futures trading bot with drawdown kill switch and paper execution")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Paper trade over a recorded bar file
    Run(RunArgs),
    /// Show persisted risk state
    Status,
    /// Show configuration
    Config,
}
