//! Expiration sweeper
//!
//! A single background task that periodically removes expired entries from
//! every registered cache. The task handle is kept so it can be stopped on
//! shutdown or test teardown.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::query_cache::QueryCache;

/// Handle to the periodic sweep task
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct Sweeper {
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl Sweeper {
    /// Start sweeping `caches` every `interval`
    ///
    /// The first sweep runs one interval after spawning. Must be called from
    /// within a tokio runtime.
    pub fn spawn(caches: Vec<Arc<QueryCache>>, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;

                let removed: usize = caches.iter().map(|cache| cache.sweep_expired()).sum();
                if removed > 0 {
                    debug!(removed, "Periodic cache sweep");
                }
            }
        });

        info!(interval_ms = interval.as_millis() as u64, "Started cache sweeper");
        Self {
            handle: Some(handle),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the sweep task
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Stopped cache sweeper");
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
