//! Cancellable quiet-window scheduling shared by the artifact pipelines.
//!
//! `schedule` arms a sleep task and cancels any prior one, so at most one
//! pending fire exists per debouncer. The generation counter guards the
//! narrow race between an abort and a task that already woke up: a stale
//! task observes a newer generation and gives up silently.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

pub struct Debounce {
    quiet: Duration,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl Debounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            generation: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Arm (or re-arm) the quiet window. `fire` runs once the window passes
    /// without a newer `schedule` call.
    pub fn schedule<F, Fut>(&mut self, fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("cancelled pending debounce, newer activity arrived");
        }

        let armed = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        let quiet = self.quiet;

        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if generation.load(Ordering::SeqCst) == armed {
                fire().await;
            } else {
                tracing::debug!("debounce fire skipped, superseded by newer activity");
            }
        }));
    }

    /// Drop any pending fire.
    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Debounce {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test(start_paused = true)]
    async fn fires_after_quiet_window() {
        let fired: Arc<Mutex<Vec<u32>>> = Arc::default();
        let mut debounce = Debounce::new(Duration::from_secs(30));

        let log = fired.clone();
        debounce.schedule(move || async move {
            log.lock().push(1);
        });

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(*fired.lock(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_coalesces_to_last_payload() {
        let fired: Arc<Mutex<Vec<u32>>> = Arc::default();
        let mut debounce = Debounce::new(Duration::from_secs(30));

        for payload in [1u32, 2, 3] {
            let log = fired.clone();
            debounce.schedule(move || async move {
                log.lock().push(payload);
            });
            tokio::time::sleep(Duration::from_secs(5)).await;
        }

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(*fired.lock(), vec![3], "only the last scheduled payload fires");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_fire() {
        let fired: Arc<Mutex<Vec<u32>>> = Arc::default();
        let mut debounce = Debounce::new(Duration::from_secs(30));

        let log = fired.clone();
        debounce.schedule(move || async move {
            log.lock().push(1);
        });
        debounce.cancel();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(fired.lock().is_empty());
    }
}
