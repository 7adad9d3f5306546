use async_trait::async_trait;

use super::Notifier;
use crate::utils::error::DeliveryError;

/// Writes alerts to the log instead of delivering them. Used when SMTP is
/// not configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        tracing::info!(recipient, subject, "{}", body.trim_end());
        Ok(())
    }
}
