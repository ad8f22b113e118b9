//! Alert delivery module
//!
//! The engine reports lifecycle and kill-switch events through an
//! [`Alerter`]. Delivery failures never stop trading.

mod log;
mod memory;

pub use log::LogAlerter;
pub use memory::{RecordedAlert, RecordingAlerter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational (start, stop)
    Info,
    /// Needs attention
    Warning,
    /// Trading is impaired
    Critical,
}

/// Alert delivery errors
#[derive(Debug, Clone, Error)]
pub enum AlertError {
    /// The channel refused or dropped the alert
    #[error("alert delivery failed: {0}")]
    Delivery(String),
}

/// Trait for alert sinks
#[async_trait]
pub trait Alerter: Send + Sync {
    /// Deliver an alert with structured key/value context
    async fn alert(
        &self,
        severity: Severity,
        message: &str,
        fields: &[(&str, String)],
    ) -> Result<(), AlertError>;
}
