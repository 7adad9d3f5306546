use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::ItemStore;
use crate::Result;
use crate::models::{ProductIdentifier, TrackedItem, to_money};
use crate::utils::error::{AppError, ValidationError};

/// Process-local store. Keeps insertion order, so `list_all` is oldest first.
#[derive(Clone, Default)]
pub struct MemoryItemStore {
    items: Arc<RwLock<Vec<TrackedItem>>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn list_all(&self) -> Result<Vec<TrackedItem>> {
        Ok(self.items.read().await.clone())
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<TrackedItem>> {
        let items = self.items.read().await;
        Ok(items.iter().filter(|i| i.is_owned_by(user_id)).cloned().collect())
    }

    async fn get(&self, identifier: &ProductIdentifier) -> Result<Option<TrackedItem>> {
        let items = self.items.read().await;
        Ok(items.iter().find(|i| &i.identifier == identifier).cloned())
    }

    async fn insert(&self, item: &TrackedItem) -> Result<()> {
        let mut items = self.items.write().await;
        if items.iter().any(|i| i.identifier == item.identifier) {
            return Err(ValidationError::DuplicateIdentifier(item.identifier.to_string()).into());
        }
        items.push(item.clone());
        Ok(())
    }

    async fn update_price(&self, identifier: &ProductIdentifier, price: Decimal) -> Result<()> {
        let mut items = self.items.write().await;
        let item = items
            .iter_mut()
            .find(|i| &i.identifier == identifier)
            .ok_or_else(|| AppError::not_found(format!("tracked item {}", identifier)))?;

        let now = Utc::now();
        item.price = to_money(price);
        item.last_checked = Some(now);
        item.updated_at = now;
        Ok(())
    }

    async fn update_details(&self, item: &TrackedItem) -> Result<()> {
        let mut items = self.items.write().await;
        let stored = items
            .iter_mut()
            .find(|i| i.identifier == item.identifier)
            .ok_or_else(|| AppError::not_found(format!("tracked item {}", item.identifier)))?;

        stored.title = item.title.clone();
        stored.threshold = to_money(item.threshold);
        stored.updated_at = item.updated_at;
        Ok(())
    }

    async fn delete(&self, identifier: &ProductIdentifier) -> Result<bool> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|i| &i.identifier != identifier);
        Ok(items.len() != before)
    }
}
