use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{ProductIdentifier, TrackedItem};

/// Alert raised by a reconciliation pass that saw a price at or below the
/// owner's threshold. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEvent {
    pub identifier: ProductIdentifier,
    pub title: String,
    pub price: Decimal,
    pub threshold: Decimal,
    pub recipient: String,
    pub product_url: String,
}

impl PriceEvent {
    pub fn for_item(item: &TrackedItem, price: Decimal, product_url: String) -> Self {
        Self {
            identifier: item.identifier.clone(),
            title: item.title.clone(),
            price,
            threshold: item.threshold,
            recipient: item.owner.email.clone(),
            product_url,
        }
    }

    pub fn subject(&self, prefix: &str) -> String {
        format!("{}: {}", prefix, self.title)
    }

    pub fn body(&self) -> String {
        let mut text = String::new();
        text.push_str(&format!(
            "Item: {} has fallen below your alert price: {}\n",
            self.title, self.threshold
        ));
        text.push_str(&format!("Current price: {}\n", self.price));
        text.push_str(&format!("Product: {}\n", self.product_url));
        text
    }
}
