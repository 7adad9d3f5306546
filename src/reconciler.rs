use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;

use crate::Result;
use crate::config::{ScraperConfig, SmtpConfig};
use crate::extractor::PriceExtractor;
use crate::fetcher::PageFetcher;
use crate::models::{PriceEvent, ProductIdentifier, TrackedItem};
use crate::notifiers::Notifier;
use crate::store::ItemStore;
use crate::utils::error::{AppError, FetchError};

#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    pub max_concurrent_checks: usize,
    pub fetch_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub alert_subject: String,
}

impl ReconcilerOptions {
    pub fn from_config(scraper: &ScraperConfig, smtp: &SmtpConfig) -> Self {
        Self {
            max_concurrent_checks: scraper.max_concurrent_checks.max(1),
            fetch_timeout: scraper.request_timeout(),
            retry_attempts: scraper.retry_attempts,
            retry_delay: Duration::from_millis(scraper.retry_delay_ms),
            alert_subject: smtp.subject.clone(),
        }
    }
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self::from_config(&ScraperConfig::default(), &SmtpConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlertStatus {
    NotTriggered,
    Sent,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Updated { price: Decimal, alert: AlertStatus },
    FetchFailed { error: String },
    ExtractionFailed { error: String },
    StoreFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub identifier: ProductIdentifier,
    pub status: ItemStatus,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassReport {
    pub started_at: Option<DateTime<Utc>>,
    pub items_checked: usize,
    pub prices_updated: usize,
    pub fetch_failures: usize,
    pub extraction_failures: usize,
    pub store_failures: usize,
    pub alerts_sent: usize,
    pub alert_failures: usize,
    pub duration_ms: u64,
    pub outcomes: Vec<ItemOutcome>,
}

impl PassReport {
    fn record(&mut self, outcome: ItemOutcome) {
        self.items_checked += 1;
        match &outcome.status {
            ItemStatus::Updated { alert, .. } => {
                self.prices_updated += 1;
                match alert {
                    AlertStatus::NotTriggered => {}
                    AlertStatus::Sent => self.alerts_sent += 1,
                    AlertStatus::Failed { .. } => self.alert_failures += 1,
                }
            }
            ItemStatus::FetchFailed { .. } => self.fetch_failures += 1,
            ItemStatus::ExtractionFailed { .. } => self.extraction_failures += 1,
            ItemStatus::StoreFailed { .. } => self.store_failures += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn outcome_for(&self, identifier: &ProductIdentifier) -> Option<&ItemOutcome> {
        self.outcomes.iter().find(|o| &o.identifier == identifier)
    }

    pub fn skipped(&self) -> usize {
        self.fetch_failures + self.extraction_failures + self.store_failures
    }
}

/// One reconciliation pass: re-scrape every tracked item, persist the
/// observed price, alert owners whose threshold has been reached.
pub struct Reconciler {
    store: Arc<dyn ItemStore>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: PriceExtractor,
    notifier: Arc<dyn Notifier>,
    options: ReconcilerOptions,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ItemStore>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: PriceExtractor,
        notifier: Arc<dyn Notifier>,
        options: ReconcilerOptions,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor,
            notifier,
            options,
        }
    }

    /// Only listing the items can fail the pass as a whole; every per-item
    /// failure is contained in the returned report.
    pub async fn run_pass(&self) -> Result<PassReport> {
        let start_time = Instant::now();
        let mut report = PassReport {
            started_at: Some(Utc::now()),
            ..PassReport::default()
        };

        let items = self.store.list_all().await?;
        tracing::debug!("Reconciliation pass started for {} items", items.len());

        let outcomes: Vec<ItemOutcome> = stream::iter(items)
            .map(|item| self.reconcile_item(item))
            .buffer_unordered(self.options.max_concurrent_checks)
            .collect()
            .await;

        for outcome in outcomes {
            report.record(outcome);
        }
        report.duration_ms = start_time.elapsed().as_millis() as u64;

        metrics::counter!("wishlist_passes_total").increment(1);
        metrics::counter!("wishlist_items_checked_total").increment(report.items_checked as u64);
        metrics::counter!("wishlist_items_skipped_total").increment(report.skipped() as u64);
        metrics::counter!("wishlist_alerts_sent_total").increment(report.alerts_sent as u64);
        metrics::counter!("wishlist_alert_failures_total").increment(report.alert_failures as u64);
        metrics::histogram!("wishlist_pass_duration_seconds").record(start_time.elapsed().as_secs_f64());

        tracing::info!(
            "Reconciliation pass finished: {} checked, {} updated, {} skipped, {} alerts sent ({} failed) in {}ms",
            report.items_checked,
            report.prices_updated,
            report.skipped(),
            report.alerts_sent,
            report.alert_failures,
            report.duration_ms
        );
        Ok(report)
    }

    async fn fetch_page(&self, identifier: &ProductIdentifier) -> std::result::Result<String, FetchError> {
        let strategy = FixedInterval::new(self.options.retry_delay)
            .take(self.options.retry_attempts as usize);

        let fetcher = &self.fetcher;
        let timeout = self.options.fetch_timeout;

        RetryIf::start(
            strategy,
            || async move {
                match tokio::time::timeout(timeout, fetcher.fetch(identifier)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout {
                        url: fetcher
                            .product_url(identifier)
                            .map(|u| u.to_string())
                            .unwrap_or_else(|_| identifier.to_string()),
                        timeout_ms: timeout.as_millis() as u64,
                    }),
                }
            },
            |e: &FetchError| {
                let retry = e.is_transient();
                if retry {
                    tracing::debug!("Retrying fetch for {}: {}", identifier, e);
                }
                retry
            },
        )
        .await
    }

    async fn reconcile_item(&self, item: TrackedItem) -> ItemOutcome {
        let start_time = Instant::now();
        let identifier = item.identifier.clone();
        let status = self.check_item(&item).await;

        ItemOutcome {
            identifier,
            status,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        }
    }

    async fn check_item(&self, item: &TrackedItem) -> ItemStatus {
        let page = match self.fetch_page(&item.identifier).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Skipping {}: fetch failed: {}", item.identifier, e);
                return ItemStatus::FetchFailed { error: e.to_string() };
            }
        };

        let product = match self.extractor.extract(&page) {
            Ok(product) => product,
            Err(e) => {
                tracing::warn!("Skipping {}: extraction failed: {}", item.identifier, e);
                return ItemStatus::ExtractionFailed { error: e.to_string() };
            }
        };

        if let Err(e) = self.store.update_price(&item.identifier, product.price).await {
            tracing::error!("Failed to store price for {}: {}", item.identifier, e);
            return ItemStatus::StoreFailed { error: e.to_string() };
        }
        tracing::debug!(
            "Updated {} from {} to {} (alert price {})",
            item.identifier,
            item.price,
            product.price,
            item.threshold
        );

        let alert = if item.is_alert_price(product.price) {
            self.send_alert(item, product.price).await
        } else {
            AlertStatus::NotTriggered
        };

        ItemStatus::Updated {
            price: product.price,
            alert,
        }
    }

    async fn send_alert(&self, item: &TrackedItem, price: Decimal) -> AlertStatus {
        let product_url = self
            .fetcher
            .product_url(&item.identifier)
            .map(|u| u.to_string())
            .unwrap_or_default();
        let event = PriceEvent::for_item(item, price, product_url);

        match self
            .notifier
            .send(&event.recipient, &event.subject(&self.options.alert_subject), &event.body())
            .await
        {
            Ok(()) => {
                tracing::info!(
                    "Alerted {} via {}: {} at {} (alert price {})",
                    event.recipient,
                    self.notifier.name(),
                    event.identifier,
                    event.price,
                    event.threshold
                );
                AlertStatus::Sent
            }
            Err(e) => {
                tracing::warn!("Alert for {} to {} failed: {}", event.identifier, event.recipient, e);
                AlertStatus::Failed { error: e.to_string() }
            }
        }
    }

    /// Run a single item outside of a pass, e.g. right after registration.
    pub async fn check_one(&self, identifier: &ProductIdentifier) -> Result<ItemOutcome> {
        let item = self
            .store
            .get(identifier)
            .await?
            .ok_or_else(|| AppError::not_found(format!("tracked item {}", identifier)))?;
        Ok(self.reconcile_item(item).await)
    }
}
