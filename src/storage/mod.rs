//! State persistence module
//!
//! Equity, high-water mark and the safe-mode latch survive restarts

mod json_file;
mod memory;

pub use json_file::JsonFileRepository;
pub use memory::MemoryRepository;

use crate::risk::RiskSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Risk state as written to storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub equity: Decimal,
    pub peak_equity: Decimal,
    pub safe_mode: bool,
    pub saved_at: DateTime<Utc>,
}

impl From<RiskSnapshot> for PersistedState {
    fn from(snapshot: RiskSnapshot) -> Self {
        Self {
            equity: snapshot.current_equity,
            peak_equity: snapshot.peak_equity,
            safe_mode: snapshot.safe_mode,
            saved_at: Utc::now(),
        }
    }
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt state: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Trait for state repositories
#[async_trait]
pub trait Repository: Send + Sync {
    /// Persist the latest state, replacing any previous one
    async fn save_state(&self, state: &PersistedState) -> Result<(), StorageError>;
    /// Latest persisted state, if any
    async fn get_state(&self) -> Result<Option<PersistedState>, StorageError>;
}
