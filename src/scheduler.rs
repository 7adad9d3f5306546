use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::Result;
use crate::config::SchedulerConfig;
use crate::reconciler::{PassReport, Reconciler};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub passes_started: u64,
    pub passes_completed: u64,
    pub passes_failed: u64,
    pub passes_skipped: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_report: Option<PassReport>,
    pub average_run_time_ms: f64,
    pub uptime_seconds: u64,
}

#[derive(Default)]
struct SharedState {
    active_passes: AtomicUsize,
    stats: RwLock<SchedulerStats>,
}

/// Runs a reconciliation pass on a fixed interval.
pub struct PriceScheduler {
    scheduler: JobScheduler,
    reconciler: Arc<Reconciler>,
    config: SchedulerConfig,
    state: Arc<SharedState>,
    job_id: Option<Uuid>,
    start_time: DateTime<Utc>,
}

impl PriceScheduler {
    pub async fn new(reconciler: Arc<Reconciler>, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            reconciler,
            config,
            state: Arc::new(SharedState::default()),
            job_id: None,
            start_time: Utc::now(),
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.job_id.is_some() {
            tracing::debug!("Price scheduler already started");
            return Ok(());
        }

        let reconciler = Arc::clone(&self.reconciler);
        let state = Arc::clone(&self.state);
        let skip_if_running = self.config.skip_if_running;

        let job = Job::new_repeated_async(self.config.interval(), move |_uuid, _l| {
            let reconciler = Arc::clone(&reconciler);
            let state = Arc::clone(&state);

            Box::pin(async move {
                Self::execute_pass(reconciler, state, skip_if_running).await;
            })
        })?;

        let job_id = self.scheduler.add(job).await?;
        self.scheduler.start().await?;
        self.job_id = Some(job_id);
        tracing::info!(
            "Price scheduler started: pass every {}s (job: {})",
            self.config.interval_seconds,
            job_id
        );

        if self.config.run_on_start {
            let reconciler = Arc::clone(&self.reconciler);
            let state = Arc::clone(&self.state);
            tokio::spawn(Self::execute_pass(reconciler, state, skip_if_running));
        }
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(job_id) = self.job_id.take() {
            self.scheduler.remove(&job_id).await?;
        }
        self.scheduler.shutdown().await?;
        tracing::info!("Price scheduler shutdown");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.job_id.is_some()
    }

    pub fn is_pass_running(&self) -> bool {
        self.state.active_passes.load(Ordering::SeqCst) > 0
    }

    /// Execute a pass immediately, outside of the schedule. Returns `None`
    /// when the pass was skipped or could not list the tracked items.
    pub async fn run_now(&self) -> Option<PassReport> {
        Self::execute_pass(
            Arc::clone(&self.reconciler),
            Arc::clone(&self.state),
            self.config.skip_if_running,
        )
        .await
    }

    pub async fn stats(&self) -> SchedulerStats {
        let mut stats = self.state.stats.read().await.clone();
        let uptime = Utc::now().signed_duration_since(self.start_time);
        stats.uptime_seconds = uptime.num_seconds().max(0) as u64;
        stats
    }

    async fn execute_pass(
        reconciler: Arc<Reconciler>,
        state: Arc<SharedState>,
        skip_if_running: bool,
    ) -> Option<PassReport> {
        let previous = state.active_passes.fetch_add(1, Ordering::SeqCst);
        if skip_if_running && previous > 0 {
            state.active_passes.fetch_sub(1, Ordering::SeqCst);
            state.stats.write().await.passes_skipped += 1;
            metrics::counter!("wishlist_passes_skipped_total").increment(1);
            tracing::warn!("Previous reconciliation pass still running, skipping this tick");
            return None;
        }

        {
            let mut stats = state.stats.write().await;
            stats.passes_started += 1;
            stats.last_run = Some(Utc::now());
        }

        let start_time = tokio::time::Instant::now();
        // A panicking pass only takes down its own task
        let outcome = tokio::spawn(async move { reconciler.run_pass().await }).await;
        let elapsed_ms = start_time.elapsed().as_millis() as f64;
        state.active_passes.fetch_sub(1, Ordering::SeqCst);

        let mut stats = state.stats.write().await;
        match outcome {
            Ok(Ok(report)) => {
                let completed = stats.passes_completed as f64;
                stats.average_run_time_ms =
                    (stats.average_run_time_ms * completed + elapsed_ms) / (completed + 1.0);
                stats.passes_completed += 1;
                stats.last_error = None;
                stats.last_report = Some(report.clone());
                Some(report)
            }
            Ok(Err(e)) => {
                tracing::error!("Reconciliation pass failed: {}", e);
                stats.passes_failed += 1;
                stats.last_error = Some(e.to_string());
                None
            }
            Err(e) => {
                tracing::error!("Reconciliation pass aborted: {}", e);
                stats.passes_failed += 1;
                stats.last_error = Some(e.to_string());
                None
            }
        }
    }
}
