//! Offline operation queue and its replay.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

use cinetrack_core::domain::{OperationType, PendingOperation};
use cinetrack_core::ports::{MovieBackend, QueryCache};
use cinetrack_infra::{ConnectivityMonitor, PendingStore};

use super::mutation::QueuedMutation;
use crate::background::BackgroundTask;
use crate::error::SyncError;

/// Background sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval of the periodic drain while online.
    pub sync_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(30),
        }
    }
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub replayed: usize,
    pub failed: usize,
    /// Operations still queued after the pass.
    pub remaining: usize,
}

struct SyncInner {
    backend: Arc<dyn MovieBackend>,
    cache: Arc<dyn QueryCache>,
    connectivity: Arc<ConnectivityMonitor>,
    store: PendingStore,
    config: SyncConfig,
    queue: AsyncMutex<Vec<PendingOperation>>,
    /// Held for the duration of a drain so passes never overlap.
    drain: AsyncMutex<()>,
    /// Bumped on every cache invalidation.
    generation: AtomicU64,
    tasks: Mutex<Vec<BackgroundTask>>,
}

/// Queues mutations made while offline and replays them in order.
#[derive(Clone)]
pub struct SyncManager {
    inner: Arc<SyncInner>,
}

impl SyncManager {
    pub fn new(
        backend: Arc<dyn MovieBackend>,
        cache: Arc<dyn QueryCache>,
        connectivity: Arc<ConnectivityMonitor>,
        store: PendingStore,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                backend,
                cache,
                connectivity,
                store,
                config,
                queue: AsyncMutex::new(Vec::new()),
                drain: AsyncMutex::new(()),
                generation: AtomicU64::new(0),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Restore the persisted queue and start the reconnect watcher and the
    /// periodic drain. Returns the number of restored operations.
    pub async fn init(&self) -> Result<usize, SyncError> {
        let restored = self.inner.store.load().await?.unwrap_or_default();
        let count = restored.len();
        {
            let mut queue = self.inner.queue.lock().await;
            // Restored operations predate anything queued before init
            queue.splice(0..0, restored);
        }
        if count > 0 {
            tracing::info!(restored = count, "Restored pending operations");
        }

        self.start_background();
        Ok(count)
    }

    /// Stop the background tasks. Queued operations stay persisted.
    pub fn dispose(&self) {
        let stopped = std::mem::take(&mut *self.tasks());
        for task in &stopped {
            task.cancel();
        }
        tracing::debug!(tasks = stopped.len(), "Sync manager disposed");
    }

    pub fn is_online(&self) -> bool {
        self.inner.connectivity.is_online()
    }

    /// Queued operations in replay order.
    pub async fn pending(&self) -> Vec<PendingOperation> {
        self.inner.queue.lock().await.clone()
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    /// Counter of cache invalidations so far.
    ///
    /// A read that saw the counter move while it was fetching holds data
    /// older than the invalidation and must not be cached.
    pub(crate) fn cache_generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Drop every cached read after a write reached the backend.
    pub(crate) async fn invalidate_cache(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.inner.cache.clear().await {
            tracing::warn!(error = %e, "Failed to invalidate query cache");
        }
    }

    /// Append an operation to the queue without executing it.
    pub async fn queue_operation(&self, op_type: OperationType, data: Value) -> PendingOperation {
        let op = PendingOperation::new(op_type, data);
        let queued = {
            let mut queue = self.inner.queue.lock().await;
            queue.push(op.clone());
            self.persist(&queue).await;
            queue.len()
        };

        tracing::info!(
            operation_id = %op.id,
            op_type = %op.op_type,
            queued,
            "Operation queued for sync"
        );
        op
    }

    pub async fn queue_mutation(
        &self,
        mutation: &QueuedMutation,
    ) -> Result<PendingOperation, SyncError> {
        let data = mutation.to_data()?;
        Ok(self.queue_operation(mutation.op_type(), data).await)
    }

    /// Replay the queue in FIFO order.
    ///
    /// Failed operations stay where they are for the next pass. The pass
    /// stops early if connectivity is lost.
    pub async fn sync_now(&self) -> SyncReport {
        let _drain = self.inner.drain.lock().await;

        let snapshot = self.pending().await;
        let mut report = SyncReport::default();
        if snapshot.is_empty() {
            return report;
        }

        tracing::info!(pending = snapshot.len(), "Syncing pending operations");
        for op in snapshot {
            if !self.is_online() {
                tracing::info!("Connectivity lost, pausing sync");
                break;
            }

            match self.replay(&op).await {
                Ok(()) => {
                    self.remove(&op.id).await;
                    report.replayed += 1;
                    tracing::info!(
                        operation_id = %op.id,
                        op_type = %op.op_type,
                        "Pending operation synced"
                    );
                }
                Err(e @ SyncError::MalformedPayload { .. }) => {
                    report.failed += 1;
                    tracing::error!(
                        operation_id = %op.id,
                        op_type = %op.op_type,
                        error = %e,
                        "Pending operation cannot be replayed, keeping it queued"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        operation_id = %op.id,
                        op_type = %op.op_type,
                        error = %e,
                        "Pending operation failed, will retry"
                    );
                }
            }
        }

        if report.replayed > 0 {
            self.invalidate_cache().await;
        }

        report.remaining = self.pending_count().await;
        tracing::info!(
            replayed = report.replayed,
            failed = report.failed,
            remaining = report.remaining,
            "Sync pass finished"
        );
        report
    }

    async fn replay(&self, op: &PendingOperation) -> Result<(), SyncError> {
        QueuedMutation::from_operation(op)?
            .apply(self.inner.backend.as_ref())
            .await
    }

    async fn remove(&self, id: &str) {
        let mut queue = self.inner.queue.lock().await;
        queue.retain(|op| op.id != id);
        self.persist(&queue).await;
    }

    async fn persist(&self, queue: &Vec<PendingOperation>) {
        if let Err(e) = self.inner.store.save(queue).await {
            tracing::warn!(error = %e, "Failed to persist pending operations");
        }
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<BackgroundTask>> {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start_background(&self) {
        let inner = Arc::downgrade(&self.inner);
        let watcher = BackgroundTask::on_change(
            "sync-reconnect",
            self.inner.connectivity.subscribe(),
            move |online: bool| {
                let inner = inner.clone();
                async move {
                    let Some(inner) = inner.upgrade() else {
                        return ControlFlow::Break(());
                    };
                    if online {
                        SyncManager { inner }.sync_now().await;
                    }
                    ControlFlow::Continue(())
                }
            },
        );

        let inner = Arc::downgrade(&self.inner);
        let periodic = BackgroundTask::every(
            "sync-periodic",
            self.inner.config.sync_interval,
            move || {
                let inner = inner.clone();
                async move {
                    let Some(inner) = inner.upgrade() else {
                        return ControlFlow::Break(());
                    };
                    let manager = SyncManager { inner };
                    if manager.is_online() && manager.pending_count().await > 0 {
                        manager.sync_now().await;
                    }
                    ControlFlow::Continue(())
                }
            },
        );

        let mut tasks = self.tasks();
        tasks.clear();
        tasks.push(watcher);
        tasks.push(periodic);
    }
}
