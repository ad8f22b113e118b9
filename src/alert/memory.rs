//! In-memory alert sink

use super::{AlertError, Alerter, Severity};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// A delivered alert
#[derive(Debug, Clone)]
pub struct RecordedAlert {
    pub severity: Severity,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

/// Keeps every alert in memory; can be switched to fail deliveries
#[derive(Debug, Default)]
pub struct RecordingAlerter {
    alerts: Mutex<Vec<RecordedAlert>>,
    failing: AtomicBool,
}

impl RecordingAlerter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (alerts are still recorded)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All alerts so far
    pub fn alerts(&self) -> Vec<RecordedAlert> {
        self.alerts.lock().clone()
    }

    /// Alerts at `severity` whose message contains `needle`
    pub fn count_matching(&self, severity: Severity, needle: &str) -> usize {
        self.alerts
            .lock()
            .iter()
            .filter(|a| a.severity == severity && a.message.contains(needle))
            .count()
    }
}

#[async_trait]
impl Alerter for RecordingAlerter {
    async fn alert(
        &self,
        severity: Severity,
        message: &str,
        fields: &[(&str, String)],
    ) -> Result<(), AlertError> {
        self.alerts.lock().push(RecordedAlert {
            severity,
            message: message.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
        if self.failing.load(Ordering::SeqCst) {
            return Err(AlertError::Delivery("sink unavailable".to_string()));
        }
        Ok(())
    }
}
