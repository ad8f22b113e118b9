//! Alerts as tracing events

use super::{AlertError, Alerter, Severity};
use async_trait::async_trait;

/// Emits alerts through the log pipeline at the matching level
#[derive(Debug, Clone, Default)]
pub struct LogAlerter;

impl LogAlerter {
    pub fn new() -> Self {
        Self
    }
}

fn render(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Alerter for LogAlerter {
    async fn alert(
        &self,
        severity: Severity,
        message: &str,
        fields: &[(&str, String)],
    ) -> Result<(), AlertError> {
        let context = render(fields);
        match severity {
            Severity::Info => tracing::info!(alert = true, %context, "{message}"),
            Severity::Warning => tracing::warn!(alert = true, %context, "{message}"),
            Severity::Critical => tracing::error!(alert = true, %context, "{message}"),
        }
        Ok(())
    }
}
