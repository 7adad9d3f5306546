use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use std::str::FromStr;
use std::time::Duration;

use super::ItemStore;
use crate::Result;
use crate::config::DatabaseConfig;
use crate::models::{Owner, ProductIdentifier, TrackedItem, to_money};
use crate::utils::error::{AppError, ValidationError};

const SELECT_COLUMNS: &str = "SELECT id, identifier, title, price, threshold, owner_id, owner_email, \
     last_checked, created_at, updated_at FROM tracked_items";

#[derive(Clone)]
pub struct SqliteItemStore {
    pool: SqlitePool,
}

impl SqliteItemStore {
    /// Open a pool for `config.url` and apply migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout))
            .connect(&config.url)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        tracing::info!("Connected item store at {}", config.url);
        Ok(store)
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn decode_money(row: &SqliteRow, column: &str) -> Result<Decimal> {
    let text: String = row.try_get(column)?;
    Decimal::from_str(&text)
        .map(to_money)
        .map_err(|e| AppError::Internal(format!("Corrupt money value '{}' in {}: {}", text, column, e)))
}

fn item_from_row(row: &SqliteRow) -> Result<TrackedItem> {
    let identifier: String = row.try_get("identifier")?;
    let identifier = ProductIdentifier::parse(&identifier)
        .map_err(|e| AppError::Internal(format!("Corrupt identifier in store: {}", e)))?;

    Ok(TrackedItem {
        id: row.try_get("id")?,
        identifier,
        title: row.try_get("title")?,
        price: decode_money(row, "price")?,
        threshold: decode_money(row, "threshold")?,
        owner: Owner {
            user_id: row.try_get("owner_id")?,
            email: row.try_get("owner_email")?,
        },
        last_checked: row.try_get::<Option<DateTime<Utc>>, _>("last_checked")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ItemStore for SqliteItemStore {
    async fn list_all(&self) -> Result<Vec<TrackedItem>> {
        let rows = sqlx::query(&format!("{} ORDER BY created_at, rowid", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<TrackedItem>> {
        let rows = sqlx::query(&format!(
            "{} WHERE owner_id = ? ORDER BY created_at, rowid",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn get(&self, identifier: &ProductIdentifier) -> Result<Option<TrackedItem>> {
        let row = sqlx::query(&format!("{} WHERE identifier = ?", SELECT_COLUMNS))
            .bind(identifier.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn insert(&self, item: &TrackedItem) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO tracked_items \
             (id, identifier, title, price, threshold, owner_id, owner_email, last_checked, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.id)
        .bind(item.identifier.as_str())
        .bind(&item.title)
        .bind(to_money(item.price).to_string())
        .bind(to_money(item.threshold).to_string())
        .bind(&item.owner.user_id)
        .bind(&item.owner.email)
        .bind(item.last_checked)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(ValidationError::DuplicateIdentifier(item.identifier.to_string()).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_price(&self, identifier: &ProductIdentifier, price: Decimal) -> Result<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE tracked_items SET price = ?, last_checked = ?, updated_at = ? WHERE identifier = ?",
        )
        .bind(to_money(price).to_string())
        .bind(now)
        .bind(now)
        .bind(identifier.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("tracked item {}", identifier)));
        }
        Ok(())
    }

    async fn update_details(&self, item: &TrackedItem) -> Result<()> {
        let result = sqlx::query(
            "UPDATE tracked_items SET title = ?, threshold = ?, updated_at = ? WHERE identifier = ?",
        )
        .bind(&item.title)
        .bind(to_money(item.threshold).to_string())
        .bind(item.updated_at)
        .bind(item.identifier.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("tracked item {}", item.identifier)));
        }
        Ok(())
    }

    async fn delete(&self, identifier: &ProductIdentifier) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tracked_items WHERE identifier = ?")
            .bind(identifier.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
