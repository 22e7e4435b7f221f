//! Background job scheduler.
//!
//! Runs the cache janitor: one sweep at startup, then one every
//! `cache_sweep_interval_secs`. Each sweep removes entries older than the
//! freshness window.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use ypcache_core::{AppConfig, CachedResponse};
use ypcache_db::CacheStore;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle. Call
/// [`JobScheduler::shutdown`] on it during process shutdown.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler<S: CacheStore>(
    store: Arc<S>,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    sweep_expired(store.as_ref()).await;
    register_sweep_job(
        &scheduler,
        store,
        Duration::from_secs(config.cache_sweep_interval_secs),
    )
    .await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring expiry sweep.
async fn register_sweep_job<S: CacheStore>(
    scheduler: &JobScheduler,
    store: Arc<S>,
    interval: Duration,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let store = Arc::clone(&store);
        Box::pin(async move {
            sweep_expired(store.as_ref()).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(
        interval_secs = interval.as_secs(),
        "scheduler: cache sweep registered"
    );
    Ok(())
}

/// Deletes every entry older than the freshness window. Failures are logged
/// and reported as `None`; the next run tries again.
pub async fn sweep_expired<S: CacheStore>(store: &S) -> Option<u64> {
    let cutoff = CachedResponse::expiry_cutoff(Utc::now());
    match store.delete_older_than(cutoff).await {
        Ok(removed) => {
            tracing::info!(removed, cutoff = %cutoff, "scheduler: cache sweep complete");
            Some(removed)
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: cache sweep failed");
            None
        }
    }
}
