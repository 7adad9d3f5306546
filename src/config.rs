use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/12.1.2 Safari/605.1.15";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub scraper: ScraperConfig,
    pub extractor: ExtractorConfig,
    pub scheduler: SchedulerConfig,
    pub notifications: NotificationsConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Scheme and host of the marketplace, e.g. `https://www.amazon.com`.
    pub base_url: String,
    pub user_agent: String,
    /// Seconds before a single page fetch is abandoned.
    pub request_timeout: u64,
    pub max_concurrent_checks: usize,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub title_selector: String,
    /// Tried in order; the first element present wins.
    pub price_selectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub interval_seconds: u64,
    pub run_on_start: bool,
    pub skip_if_running: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: String,
    pub use_tls: bool,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://wishlist.db?mode=rwc".to_string(),
            max_connections: 5,
            acquire_timeout: 30,
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.amazon.com".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: 15,
            max_concurrent_checks: 4,
            retry_attempts: 1,
            retry_delay_ms: 500,
        }
    }
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            title_selector: "#productTitle".to_string(),
            price_selectors: vec![
                "#priceblock_ourprice".to_string(),
                "#priceblock_dealprice".to_string(),
            ],
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 30,
            run_on_start: false,
            skip_if_running: true,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 587,
            username: None,
            password: None,
            from_address: None,
            from_name: "Wishlist Watcher".to_string(),
            use_tls: true,
            subject: "Wishlist Price Alert".to_string(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1:9001".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "wishlist_watcher=info".to_string(),
            directory: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Self::environment())
    }

    /// Variables with prefix "WISHLIST_", e.g. WISHLIST_SCHEDULER__INTERVAL_SECONDS
    fn environment() -> Environment {
        Environment::with_prefix("WISHLIST")
            .prefix_separator("_")
            .separator("__")
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Built-in defaults so every file is optional
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            .add_source(environment)
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Message("Database max_connections must be greater than 0".into()));
        }

        if Url::parse(&self.scraper.base_url).is_err() {
            return Err(ConfigError::Message("Invalid scraper base_url format".into()));
        }

        if self.scraper.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Scraper user_agent must not be empty".into()));
        }

        if self.scraper.request_timeout == 0 {
            return Err(ConfigError::Message("Scraper request_timeout must be greater than 0".into()));
        }

        if self.scraper.max_concurrent_checks == 0 {
            return Err(ConfigError::Message("Scraper max_concurrent_checks must be greater than 0".into()));
        }

        if self.extractor.title_selector.trim().is_empty() {
            return Err(ConfigError::Message("Extractor title_selector must not be empty".into()));
        }

        if self.extractor.price_selectors.is_empty()
            || self.extractor.price_selectors.iter().any(|s| s.trim().is_empty())
        {
            return Err(ConfigError::Message("Extractor price_selectors must be non-empty selectors".into()));
        }

        if self.scheduler.interval_seconds == 0 {
            return Err(ConfigError::Message("Scheduler interval_seconds must be greater than 0".into()));
        }

        if self.notifications.smtp.enabled {
            if self.notifications.smtp.port == 0 {
                return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
            }
            if self.notifications.smtp.from_address.is_none() {
                return Err(ConfigError::Message("SMTP from_address is required when SMTP is enabled".into()));
            }
        }

        if self.metrics.enabled && self.metrics.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Message("Metrics listen_addr must be a socket address".into()));
        }

        Ok(())
    }
}
