//! Best-effort side-task queue
//!
//! Task-id attachment and reward submission must never block or fail the
//! primary fact-check flow. Instead of firing and forgetting, side calls go
//! through this explicit queue: each job runs at most once on a background
//! worker, failures are logged and counted, and completion is observable
//! through the metrics without ever being awaited by the dispatcher.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use verity_domain::SessionId;
use verity_provider::{CheckBackend, ProviderError, RewardRequest};

/// A deferred, best-effort backend call
#[derive(Debug, Clone)]
pub enum SideTask {
    /// Attach a provider task id to a search session
    AttachTaskId {
        /// The session the task id belongs to
        session_id: SessionId,
        /// The provider-assigned task id
        task_id: String,
    },

    /// Submit a reward for a feedback or share action
    RewardPoints {
        /// The reward request to forward
        request: RewardRequest,
    },
}

impl SideTask {
    fn kind(&self) -> &'static str {
        match self {
            SideTask::AttachTaskId { .. } => "attach_task_id",
            SideTask::RewardPoints { .. } => "reward_points",
        }
    }
}

/// Counters for observing side-task outcomes
#[derive(Debug, Default)]
pub struct SideTaskMetrics {
    enqueued: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl SideTaskMetrics {
    /// Tasks accepted onto the queue
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::SeqCst)
    }

    /// Tasks that ran and succeeded
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Tasks that ran and failed (failure is terminal; nothing retries)
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Tasks rejected because the queue was full or closed
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "side tasks: {} enqueued, {} completed, {} failed, {} dropped",
            self.enqueued(),
            self.completed(),
            self.failed(),
            self.dropped()
        )
    }
}

/// Queue plus background worker for best-effort side calls
pub struct SideTaskQueue {
    tx: mpsc::Sender<SideTask>,
    metrics: Arc<SideTaskMetrics>,
    worker: JoinHandle<()>,
}

impl SideTaskQueue {
    /// Spawn the worker loop against a backend
    pub fn spawn<B: CheckBackend + 'static>(backend: Arc<B>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<SideTask>(capacity);
        let metrics = Arc::new(SideTaskMetrics::default());
        let worker_metrics = Arc::clone(&metrics);

        let worker = tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                let kind = task.kind();
                match run_task(backend.as_ref(), task).await {
                    Ok(()) => {
                        worker_metrics.completed.fetch_add(1, Ordering::SeqCst);
                        debug!(kind, "Side task completed");
                    }
                    Err(e) => {
                        worker_metrics.failed.fetch_add(1, Ordering::SeqCst);
                        warn!(kind, error = %e, "Side task failed");
                    }
                }
            }
            debug!("Side task worker drained and stopped");
        });

        Self {
            tx,
            metrics,
            worker,
        }
    }

    /// Offer a task to the queue without blocking
    ///
    /// Returns false when the queue is full or the worker is gone; the task
    /// is dropped and counted, matching the best-effort contract.
    pub fn enqueue(&self, task: SideTask) -> bool {
        let kind = task.kind();
        match self.tx.try_send(task) {
            Ok(()) => {
                self.metrics.enqueued.fetch_add(1, Ordering::SeqCst);
                true
            }
            Err(e) => {
                self.metrics.dropped.fetch_add(1, Ordering::SeqCst);
                warn!(kind, error = %e, "Side task dropped");
                false
            }
        }
    }

    /// Observable counters
    pub fn metrics(&self) -> &SideTaskMetrics {
        &self.metrics
    }

    /// Shared handle to the counters, surviving shutdown
    pub fn metrics_handle(&self) -> Arc<SideTaskMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Close the queue and wait for queued tasks to drain
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            warn!(error = %e, "Side task worker join failed");
        }
    }
}

async fn run_task<B: CheckBackend>(backend: &B, task: SideTask) -> Result<(), ProviderError> {
    match task {
        SideTask::AttachTaskId {
            session_id,
            task_id,
        } => backend.attach_task_id(&session_id, &task_id).await,
        SideTask::RewardPoints { request } => {
            backend.reward_points(&request).await.map(|_| ())
        }
    }
}
