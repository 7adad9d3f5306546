use async_trait::async_trait;

use crate::utils::error::DeliveryError;

pub mod email;
pub mod log;

pub use email::EmailNotifier;
pub use log::LogNotifier;

/// Delivers a message to a user's address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), DeliveryError>;
}
