use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::Result;
use crate::models::{ProductIdentifier, TrackedItem};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryItemStore;
pub use sqlite::SqliteItemStore;

/// Durable record of tracked items.
///
/// Every method is a single short operation; nothing holds a lock between
/// calls, so registrations proceed while a reconciliation pass is running.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// All items, oldest first.
    async fn list_all(&self) -> Result<Vec<TrackedItem>>;

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<TrackedItem>>;

    async fn get(&self, identifier: &ProductIdentifier) -> Result<Option<TrackedItem>>;

    /// Fails with `ValidationError::DuplicateIdentifier` if the identifier is taken.
    async fn insert(&self, item: &TrackedItem) -> Result<()>;

    /// Overwrite the stored price and stamp `last_checked`. Fails with
    /// `NotFound` if the item no longer exists.
    async fn update_price(&self, identifier: &ProductIdentifier, price: Decimal) -> Result<()>;

    /// Persist owner-editable fields (title, threshold).
    async fn update_details(&self, item: &TrackedItem) -> Result<()>;

    /// Returns whether a record was removed.
    async fn delete(&self, identifier: &ProductIdentifier) -> Result<bool>;
}
