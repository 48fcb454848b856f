//! Expiration Sweep Task
//!
//! Background task that removes expired cache entries shortly after startup
//! and, if configured, on a fixed interval afterwards.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{run_locked, CacheEngine, SharedEngine};

/// Schedules the passive expiration sweep.
///
/// The first sweep runs once `delay` has elapsed, so it does not compete
/// with startup work. When `interval` is set the task keeps sweeping every
/// `interval` until aborted; otherwise it finishes after the first pass.
/// Each sweep holds the engine lock on the blocking pool.
///
/// # Example
/// ```ignore
/// let engine = CacheEngine::new(MemoryStorage::new(), CacheLimits::default()).into_shared();
/// let sweep_handle = initialize(engine.clone(), Duration::from_secs(5), None);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn initialize(
    engine: SharedEngine,
    delay: Duration,
    interval: Option<Duration>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("Expiration sweep scheduled in {:?}", delay);
        tokio::time::sleep(delay).await;
        sweep(&engine).await;

        let Some(interval) = interval else {
            return;
        };
        info!("Periodic expiration sweep every {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;
            sweep(&engine).await;
        }
    })
}

async fn sweep(engine: &SharedEngine) {
    let report = match run_locked(engine, CacheEngine::cleanup_expired).await {
        Ok(report) => report,
        Err(e) => {
            warn!("Expiration sweep failed: {}", e);
            return;
        }
    };
    debug!(
        "Expiration sweep done: {} removed, {} live",
        report.removed(),
        report.live
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cache::make_key;
    use crate::clock::ManualClock;
    use crate::config::CacheLimits;
    use crate::storage::{MemoryStorage, StorageAdapter};

    fn shared_engine() -> (SharedEngine, ManualClock) {
        let clock = ManualClock::new(1_000);
        let engine = CacheEngine::with_clock(
            MemoryStorage::new(),
            CacheLimits::default(),
            Arc::new(clock.clone()),
        );
        (engine.into_shared(), clock)
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_entries_after_delay() {
        let (engine, clock) = shared_engine();
        let key = make_key("search", &[&"song"]);

        engine
            .lock()
            .await
            .set(&key, "results", Duration::from_millis(100));
        clock.advance(500);

        let handle = initialize(engine.clone(), Duration::from_millis(50), None);
        handle.await.expect("sweep task panicked");

        // The entry is gone from the medium, not just hidden by the read path
        let guard = engine.lock().await;
        assert!(guard.storage().get(&key).is_none());
        assert!(guard.index().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_preserves_live_entries() {
        let (engine, _clock) = shared_engine();
        let key = make_key("lyrics", &[&"netease", &42]);

        engine
            .lock()
            .await
            .set(&key, "la la la", Duration::from_secs(3600));

        let handle = initialize(engine.clone(), Duration::from_millis(10), None);
        handle.await.expect("sweep task panicked");

        let value: Option<String> = engine.lock().await.get(&key);
        assert_eq!(value.as_deref(), Some("la la la"));
    }

    #[tokio::test]
    async fn test_periodic_sweep_keeps_running() {
        let (engine, clock) = shared_engine();
        let key = make_key("playlist", &[&7]);

        let handle = initialize(
            engine.clone(),
            Duration::from_millis(10),
            Some(Duration::from_millis(50)),
        );

        // Written after the first sweep, expired before a later one
        tokio::time::sleep(Duration::from_millis(30)).await;
        engine.lock().await.set(&key, "tracks", Duration::from_millis(1));
        clock.advance(10);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!handle.is_finished());
        assert!(engine.lock().await.storage().get(&key).is_none());

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let (engine, _clock) = shared_engine();

        let handle = initialize(engine, Duration::from_secs(60), None);

        // Abort before the delay elapses
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
