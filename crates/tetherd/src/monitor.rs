//! Named periodic task scheduler.
//!
//! Re-scheduling a name replaces the previous timer instead of stacking a
//! second one; cancelling is idempotent. Tasks run on spawned tokio
//! interval loops and are aborted on shutdown.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct PeriodicScheduler {
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Default for PeriodicScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PeriodicScheduler {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Run `task` every `period`, starting immediately. An existing
    /// schedule under the same name is aborted first - replaced, never
    /// stacked.
    pub fn schedule<F, Fut>(&self, name: &str, period: Duration, task: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                task().await;
            }
        });

        let mut tasks = self.tasks.lock().unwrap();
        if let Some(previous) = tasks.insert(name.to_string(), handle) {
            debug!("Replacing periodic task '{}'", name);
            previous.abort();
        }
        info!("Scheduled periodic task '{}' every {:?}", name, period);
    }

    pub fn cancel(&self, name: &str) {
        if let Some(handle) = self.tasks.lock().unwrap().remove(name) {
            handle.abort();
            info!("Cancelled periodic task '{}'", name);
        }
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.tasks.lock().unwrap().contains_key(name)
    }

    /// Abort every schedule; used on daemon shutdown.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap();
        for (name, handle) in tasks.drain() {
            debug!("Aborting periodic task '{}'", name);
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_schedule_runs_task() {
        let scheduler = PeriodicScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        scheduler.schedule("tick", Duration::from_millis(10), move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(60)).await;
        scheduler.shutdown();
        assert!(counter.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_reschedule_replaces_not_stacks() {
        let scheduler = PeriodicScheduler::new();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let c = Arc::clone(&first);
        scheduler.schedule("job", Duration::from_millis(10), move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(30)).await;

        let c = Arc::clone(&second);
        scheduler.schedule("job", Duration::from_millis(10), move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        let first_after_replace = first.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.shutdown();

        // The first task stopped ticking once replaced.
        assert_eq!(first.load(Ordering::SeqCst), first_after_replace);
        assert!(second.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let scheduler = PeriodicScheduler::new();
        scheduler.schedule("job", Duration::from_millis(10), || async {});
        assert!(scheduler.is_scheduled("job"));
        scheduler.cancel("job");
        scheduler.cancel("job");
        assert!(!scheduler.is_scheduled("job"));
    }
}
