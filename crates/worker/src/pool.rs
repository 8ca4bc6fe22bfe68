//! Bounded worker pool.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

/// Runs spawned futures with at most `size` of them executing at once.
///
/// Futures beyond the limit are spawned immediately but wait for a permit
/// before doing any work, so spawning never blocks the caller.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            tracker: TaskTracker::new(),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of spawned futures that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    pub fn spawn<F>(&self, label: &'static str, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                tracing::warn!(label, "Worker pool closed, dropping work");
                return;
            };
            work.await;
        });
    }

    /// Stop accepting work and wait up to `grace` for in-flight futures.
    ///
    /// Returns `false` if the grace period elapsed first.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        let drained = tokio::time::timeout(grace, self.tracker.wait()).await.is_ok();
        self.permits.close();
        drained
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_pool_size() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.spawn("test", async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }

        assert!(pool.shutdown(Duration::from_secs(5)).await);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn zero_size_is_clamped_to_one() {
        assert_eq!(WorkerPool::new(0).size(), 1);
    }
}
