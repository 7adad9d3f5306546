use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use wishlist_watcher::config::{AppConfig, LoggingConfig, MetricsConfig, SmtpConfig};
use wishlist_watcher::{
    EmailNotifier, HttpPageFetcher, ItemManager, ItemRequest, ItemUpdate, LogNotifier, Notifier, Owner,
    PriceExtractor, PriceScheduler, ProductIdentifier, Reconciler, ReconcilerOptions, SqliteItemStore,
};

#[derive(Debug, Parser)]
#[command(name = "wishlist-watcher", about = "Track marketplace prices and email owners when they drop", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the reconciliation job on its configured interval until interrupted.
    Run,
    /// Run a single reconciliation pass and print the report.
    ///
    /// With an identifier only that item is checked.
    Check { identifier: Option<String> },
    /// Start tracking a product.
    Add {
        identifier: String,
        /// Alert price; an email is sent whenever the price is at or below it.
        #[arg(long)]
        threshold: Decimal,
        #[arg(long)]
        user: String,
        #[arg(long)]
        email: String,
    },
    /// List tracked items, optionally for a single owner.
    List {
        #[arg(long)]
        user: Option<String>,
    },
    /// Change the title or alert price of an item.
    Update {
        identifier: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        threshold: Option<Decimal>,
    },
    /// Stop tracking an item.
    Remove {
        identifier: String,
        #[arg(long)]
        user: String,
    },
}

fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.filter))?;
    let console_layer = fmt::layer().with_target(false).compact();

    match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)
                .with_context(|| format!("creating log directory {}", directory))?;
            let file_appender = tracing_appender::rolling::daily(directory, "wishlist-watcher.log");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer().with_writer(writer).with_ansi(false).json();

            tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .with(file_layer)
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .try_init()?;
            Ok(None)
        }
    }
}

fn init_metrics(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }
    let addr: SocketAddr = config.listen_addr.parse()?;
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("installing Prometheus exporter")?;
    info!("Serving metrics on http://{}/metrics", addr);
    Ok(())
}

fn build_notifier(config: &SmtpConfig) -> Result<Arc<dyn Notifier>> {
    if config.enabled {
        Ok(Arc::new(EmailNotifier::new(config)?))
    } else {
        info!("SMTP disabled, alerts will be written to the log");
        Ok(Arc::new(LogNotifier::new()))
    }
}

fn build_reconciler(
    config: &AppConfig,
    store: Arc<SqliteItemStore>,
    fetcher: Arc<HttpPageFetcher>,
    extractor: PriceExtractor,
) -> Result<Reconciler> {
    let notifier = build_notifier(&config.notifications.smtp)?;
    Ok(Reconciler::new(
        store,
        fetcher,
        extractor,
        notifier,
        ReconcilerOptions::from_config(&config.scraper, &config.notifications.smtp),
    ))
}

fn print_item(item: &wishlist_watcher::TrackedItem) {
    println!(
        "{}  {:>10}  alert {:>10}  {}  ({})",
        item.identifier, item.price, item.threshold, item.title, item.owner.user_id
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("loading configuration")?;
    let _log_guard = init_tracing(&config.logging)?;

    let store = Arc::new(SqliteItemStore::connect(&config.database).await?);
    let fetcher = Arc::new(HttpPageFetcher::new(&config.scraper)?);
    let extractor = PriceExtractor::new(&config.extractor)?;

    match cli.command {
        Command::Check { identifier } => {
            let reconciler = build_reconciler(&config, store, fetcher, extractor)?;
            match identifier {
                Some(raw) => {
                    let identifier = ProductIdentifier::parse(&raw)?;
                    let outcome = reconciler.check_one(&identifier).await?;
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                }
                None => {
                    let report = reconciler.run_pass().await?;
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
        }
        Command::Run => {
            init_metrics(&config.metrics)?;
            let reconciler = build_reconciler(&config, store, fetcher, extractor)?;

            info!("Starting Wishlist Watcher...");
            let mut scheduler = PriceScheduler::new(Arc::new(reconciler), config.scheduler.clone()).await?;
            scheduler.start().await?;

            tokio::signal::ctrl_c().await?;
            info!("Shutting down...");
            scheduler.shutdown().await?;
        }
        Command::Add {
            identifier,
            threshold,
            user,
            email,
        } => {
            let manager = ItemManager::new(store, fetcher, extractor);
            let item = manager
                .create_item(ItemRequest {
                    identifier,
                    threshold,
                    owner: Owner { user_id: user, email },
                })
                .await?;
            print_item(&item);
        }
        Command::List { user } => {
            let manager = ItemManager::new(store, fetcher, extractor);
            let items = match user {
                Some(user) => manager.list_by_owner(&user).await?,
                None => manager.list_items().await?,
            };
            for item in &items {
                print_item(item);
            }
        }
        Command::Update {
            identifier,
            user,
            title,
            threshold,
        } => {
            let manager = ItemManager::new(store, fetcher, extractor);
            let item = manager
                .update_item(&identifier, &user, ItemUpdate { title, threshold })
                .await?;
            print_item(&item);
        }
        Command::Remove { identifier, user } => {
            let manager = ItemManager::new(store, fetcher, extractor);
            manager.delete_item(&identifier, &user).await?;
            println!("Stopped tracking {}", identifier);
        }
    }

    Ok(())
}
