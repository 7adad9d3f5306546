pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod item_manager;
pub mod models;
pub mod notifiers;
pub mod reconciler;
pub mod scheduler;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use extractor::{ExtractedProduct, PriceExtractor};
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use item_manager::{ItemManager, ItemRequest, ItemUpdate};
pub use models::{Owner, PriceEvent, ProductIdentifier, TrackedItem};
pub use notifiers::{EmailNotifier, LogNotifier, Notifier};
pub use reconciler::{AlertStatus, ItemOutcome, ItemStatus, PassReport, Reconciler, ReconcilerOptions};
pub use scheduler::{PriceScheduler, SchedulerStats};
pub use store::{ItemStore, MemoryItemStore, SqliteItemStore};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
