use crate::prices::{PriceRefreshService, RefreshError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Drives [`PriceRefreshService::refresh_all`] on a fixed interval from a background task.
///
/// The first scheduled pass fires one full `period` after start; callers run their own startup
/// pass synchronously.
pub struct PriceRefreshScheduler;

impl PriceRefreshScheduler {
    pub fn start(service: Arc<PriceRefreshService>, period: Duration) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(period_secs = period.as_secs(), "price refresh scheduler started");

            loop {
                // A pass that already started is never raced against shutdown; only the wait is.
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => run_scheduled_pass(&service).await,
                }
            }

            tracing::info!("price refresh scheduler stopped");
        });

        SchedulerHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

async fn run_scheduled_pass(service: &PriceRefreshService) {
    match service.refresh_all().await {
        Ok(summary) => {
            tracing::debug!(updated_count = summary.updated_count, "scheduled price refresh done");
        }
        Err(RefreshError::Busy) => {
            tracing::info!("previous price refresh still running; skipping this tick");
        }
        Err(err) => {
            tracing::error!(error = %err, "scheduled price refresh failed");
        }
    }
}

/// Owner of the running scheduler task. Dropping it stops the timer as well.
pub struct SchedulerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop the timer and wait for an in-flight pass, if any, to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "price refresh scheduler task panicked");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
