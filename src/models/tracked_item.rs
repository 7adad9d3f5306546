use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::models::{generate_id, to_money};
use crate::utils::error::ValidationError;

/// Product key used to address a marketplace page, e.g. an ASIN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductIdentifier(String);

impl ProductIdentifier {
    pub const LENGTH: usize = 10;

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let actual = raw.chars().count();
        if actual != Self::LENGTH {
            return Err(ValidationError::IdentifierLength {
                expected: Self::LENGTH,
                actual,
            });
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::IdentifierCharset(raw.to_string()));
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProductIdentifier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProductIdentifier {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProductIdentifier> for String {
    fn from(value: ProductIdentifier) -> Self {
        value.0
    }
}

/// Back-reference to the user who owns an item. Only used to route alerts
/// and to check ownership; accounts live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Owner {
    #[validate(length(min = 1, message = "owner id must not be empty"))]
    pub user_id: String,
    #[validate(email(message = "owner email must be a valid address"))]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub id: String,
    pub identifier: ProductIdentifier,
    pub title: String,
    pub price: Decimal,
    pub threshold: Decimal,
    pub owner: Owner,
    pub last_checked: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTrackedItem {
    pub identifier: ProductIdentifier,
    pub title: String,
    pub price: Decimal,
    pub threshold: Decimal,
    pub owner: Owner,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTrackedItem {
    pub title: Option<String>,
    pub threshold: Option<Decimal>,
}

impl TrackedItem {
    pub fn new(new_item: NewTrackedItem) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            identifier: new_item.identifier,
            title: new_item.title,
            price: to_money(new_item.price),
            threshold: to_money(new_item.threshold),
            owner: new_item.owner,
            last_checked: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update(&mut self, update: UpdateTrackedItem) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(threshold) = update.threshold {
            self.threshold = to_money(threshold);
        }
        self.updated_at = Utc::now();
    }

    /// True when `price` is at or below this item's alert threshold.
    pub fn is_alert_price(&self, price: Decimal) -> bool {
        price <= self.threshold
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner.user_id == user_id
    }
}
