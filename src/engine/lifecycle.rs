//! Engine lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// `Stopped -> Starting -> Running -> Stopping -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl EngineState {
    /// Whether `start` may begin from this state
    pub fn can_start(self) -> bool {
        self == EngineState::Stopped
    }

    /// Whether the state is mid-transition
    pub fn is_transitioning(self) -> bool {
        matches!(self, EngineState::Starting | EngineState::Stopping)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Stopped => "stopped",
            EngineState::Starting => "starting",
            EngineState::Running => "running",
            EngineState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}
