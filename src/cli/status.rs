//! Status command implementation

use crate::config::Config;
use crate::storage::{JsonFileRepository, Repository};

/// Print the persisted risk state, if any
pub async fn show_status(config: &Config) -> anyhow::Result<()> {
    let repository = JsonFileRepository::new(&config.storage.state_path);
    println!("futures-bot status");
    println!("  Symbol: {}", config.engine.symbol);
    match repository.get_state().await? {
        Some(state) => {
            println!("  Equity: {}", state.equity);
            println!("  Peak equity: {}", state.peak_equity);
            println!(
                "  Safe mode: {}",
                if state.safe_mode { "ACTIVE" } else { "off" }
            );
            println!("  Saved at: {}", state.saved_at);
        }
        None => println!("  No saved state at {}", repository.path().display()),
    }
    Ok(())
}
