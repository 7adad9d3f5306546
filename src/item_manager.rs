use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::Result;
use crate::extractor::PriceExtractor;
use crate::fetcher::PageFetcher;
use crate::models::{NewTrackedItem, Owner, ProductIdentifier, TrackedItem, UpdateTrackedItem, to_money};
use crate::store::ItemStore;
use crate::utils::error::{AppError, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRequest {
    pub identifier: String,
    pub threshold: Decimal,
    pub owner: Owner,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub threshold: Option<Decimal>,
}

/// Registration and owner-scoped maintenance of tracked items.
pub struct ItemManager {
    store: Arc<dyn ItemStore>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: PriceExtractor,
}

fn validate_threshold(threshold: Decimal) -> std::result::Result<Decimal, ValidationError> {
    if threshold < Decimal::ZERO {
        return Err(ValidationError::NegativeThreshold(threshold));
    }
    Ok(to_money(threshold))
}

impl ItemManager {
    pub fn new(
        store: Arc<dyn ItemStore>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: PriceExtractor,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor,
        }
    }

    /// Validate the request, scrape the page once, then persist. Nothing is
    /// stored unless the initial scrape succeeds.
    pub async fn create_item(&self, request: ItemRequest) -> Result<TrackedItem> {
        let identifier = ProductIdentifier::parse(&request.identifier)?;
        let threshold = validate_threshold(request.threshold)?;
        request.owner.validate()?;

        if self.store.get(&identifier).await?.is_some() {
            return Err(ValidationError::DuplicateIdentifier(identifier.to_string()).into());
        }

        let page = self.fetcher.fetch(&identifier).await?;
        let product = self.extractor.extract(&page)?;

        if product.price <= threshold {
            return Err(ValidationError::ThresholdNotBelowPrice {
                price: product.price,
                threshold,
            }
            .into());
        }

        let item = TrackedItem::new(NewTrackedItem {
            identifier,
            title: product.title,
            price: product.price,
            threshold,
            owner: request.owner,
        });
        self.store.insert(&item).await?;

        tracing::info!(
            "Tracking {} ({}) for {} at {} with alert price {}",
            item.identifier,
            item.title,
            item.owner.user_id,
            item.price,
            item.threshold
        );
        Ok(item)
    }

    pub async fn get_item(&self, identifier: &str) -> Result<TrackedItem> {
        let identifier = ProductIdentifier::parse(identifier)?;
        self.store
            .get(&identifier)
            .await?
            .ok_or_else(|| AppError::not_found(format!("tracked item {}", identifier)))
    }

    pub async fn list_items(&self) -> Result<Vec<TrackedItem>> {
        self.store.list_all().await
    }

    pub async fn list_by_owner(&self, user_id: &str) -> Result<Vec<TrackedItem>> {
        self.store.list_by_owner(user_id).await
    }

    async fn owned_item(&self, identifier: &str, user_id: &str) -> Result<TrackedItem> {
        let item = self.get_item(identifier).await?;
        if !item.is_owned_by(user_id) {
            return Err(AppError::Forbidden {
                message: format!("{} is not tracked by {}", item.identifier, user_id),
            });
        }
        Ok(item)
    }

    pub async fn update_item(&self, identifier: &str, user_id: &str, update: ItemUpdate) -> Result<TrackedItem> {
        let mut item = self.owned_item(identifier, user_id).await?;

        let title = match update.title {
            Some(title) if title.trim().is_empty() => {
                return Err(ValidationError::Field("title must not be empty".to_string()).into());
            }
            Some(title) => Some(title.trim().to_string()),
            None => None,
        };
        let threshold = update.threshold.map(validate_threshold).transpose()?;

        item.update(UpdateTrackedItem { title, threshold });
        self.store.update_details(&item).await?;

        tracing::info!(
            "Updated {}: title '{}', alert price {}",
            item.identifier,
            item.title,
            item.threshold
        );
        Ok(item)
    }

    pub async fn delete_item(&self, identifier: &str, user_id: &str) -> Result<()> {
        let item = self.owned_item(identifier, user_id).await?;
        if !self.store.delete(&item.identifier).await? {
            return Err(AppError::not_found(format!("tracked item {}", item.identifier)));
        }
        tracing::info!("Stopped tracking {} for {}", item.identifier, user_id);
        Ok(())
    }
}
