//! Background tasks owned by the client services.
//!
//! Each task runs in its own tokio task and stops when cancelled or dropped.
//! A run that is already executing completes; the loop exits at the next
//! wake-up.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Handle to a running background loop.
pub struct BackgroundTask {
    name: &'static str,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    /// Run `task` every `period`, first after one full period.
    ///
    /// The loop ends when `task` returns `ControlFlow::Break`.
    pub fn every<F, Fut>(name: &'static str, period: Duration, task: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let (stop, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => {
                        if task().await.is_break() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(task = name, "Background task stopped");
        });

        tracing::debug!(task = name, period_secs = period.as_secs(), "Background task started");
        Self { name, stop, handle }
    }

    /// Run `task` with every new value observed on `changes`.
    pub fn on_change<T, F, Fut>(name: &'static str, mut changes: watch::Receiver<T>, task: F) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let (stop, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stopped.changed() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let value = changes.borrow_and_update().clone();
                        if task(value).await.is_break() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(task = name, "Background task stopped");
        });

        Self { name, stop, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the loop to stop.
    pub fn cancel(&self) {
        // Err only means the loop already exited
        if self.stop.send(true).is_ok() {
            tracing::debug!(task = self.name, "Stopping background task");
        }
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_waits_one_period_first() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let task = BackgroundTask::every("tick", Duration::from_secs(30), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ControlFlow::Continue(())
            }
        });

        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        task.cancel();
        settle().await;
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_the_loop() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let task = BackgroundTask::every("tick", Duration::from_secs(1), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ControlFlow::Continue(())
            }
        });
        drop(task);

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_on_change_sees_each_value() {
        let (tx, rx) = watch::channel(false);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _task = BackgroundTask::on_change("watch", rx, move |online: bool| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(online);
                ControlFlow::Continue(())
            }
        });

        tx.send(true).unwrap();
        settle().await;
        tx.send(false).unwrap();
        settle().await;

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }
}
