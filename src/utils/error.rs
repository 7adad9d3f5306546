use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure to retrieve a product page. Recoverable: the item is skipped.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid product url: {0}")]
    InvalidUrl(String),

    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::InvalidUrl(_) => false,
            FetchError::Network { .. } | FetchError::Timeout { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// The page did not have the shape the extractor expects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("title element `{selector}` not found")]
    TitleMissing { selector: String },

    #[error("title element is empty")]
    TitleEmpty,

    #[error("price element not found (tried {selectors})")]
    PriceMissing { selectors: String },

    #[error("price text `{text}` does not start with a currency symbol")]
    MissingCurrencySymbol { text: String },

    #[error("price text `{text}` has no decimal point")]
    NoDecimalPoint { text: String },

    #[error("price text `{text}` is malformed")]
    MalformedPrice { text: String },

    #[error("invalid selector `{selector}`: {message}")]
    InvalidSelector { selector: String, message: String },
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("invalid address `{address}`: {message}")]
    InvalidAddress { address: String, message: String },

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Rejected input at registration or update time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("identifier must be exactly {expected} characters, got {actual}")]
    IdentifierLength { expected: usize, actual: usize },

    #[error("identifier `{0}` must contain only ASCII letters and digits")]
    IdentifierCharset(String),

    #[error("identifier `{0}` is already tracked")]
    DuplicateIdentifier(String),

    #[error("alert price must not be negative, got {0}")]
    NegativeThreshold(Decimal),

    #[error("alert price {threshold} must be below the current price {price}")]
    ThresholdNotBelowPrice { price: Decimal, threshold: Decimal },

    #[error("invalid field: {0}")]
    Field(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(ValidationError::Field(err.to_string()))
    }
}

impl AppError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound {
            resource: resource.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
