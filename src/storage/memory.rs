//! In-memory repository

use super::{PersistedState, Repository, StorageError};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Keeps the latest state in memory
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<Option<PersistedState>>,
    saves: Mutex<usize>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `state` already stored
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            saves: Mutex::new(0),
        }
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn save_state(&self, state: &PersistedState) -> Result<(), StorageError> {
        *self.state.lock() = Some(state.clone());
        *self.saves.lock() += 1;
        Ok(())
    }

    async fn get_state(&self) -> Result<Option<PersistedState>, StorageError> {
        Ok(self.state.lock().clone())
    }
}
