//! The fact-check dispatcher

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::sink::ResultsSink;
use crate::tasks::{SideTask, SideTaskMetrics, SideTaskQueue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use verity_credits::CreditMirror;
use verity_domain::{
    ExtractedClaim, FactCheckRecord, SearchQuery, SessionId, UserIdentity,
};
use verity_provider::{CheckBackend, CheckRequest};

/// Cooperative cancellation flag, polled between batches
///
/// Cancellation is coarse on purpose: a batch that has been dispatched runs
/// to completion, only subsequent batches are skipped, and records already
/// written stay in the sink.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a flag in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of any cycle polling this flag
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What one dispatch cycle produced
#[derive(Debug, Clone)]
pub struct DispatchSummary {
    /// The session id generated for this submission
    pub session_id: SessionId,

    /// Records in completion order (batch order preserved across batches)
    pub records: Vec<FactCheckRecord>,

    /// Total claims the cycle set out to verify
    pub claims_total: usize,

    /// Whether the cycle stopped early on the cancel flag
    pub cancelled: bool,
}

/// Clears the submitting flag when a cycle ends, however it ends
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The claim fan-out dispatcher
///
/// One dispatcher per search surface. At most one cycle runs at a time;
/// overlapping [`run`](Self::run) calls fail with [`PipelineError::Busy`].
/// Must be created inside a tokio runtime (it spawns the side-task worker).
pub struct Dispatcher<B> {
    backend: Arc<B>,
    config: PipelineConfig,
    sink: Arc<ResultsSink>,
    side_tasks: SideTaskQueue,
    credits: Option<Arc<CreditMirror<B>>>,
    identity: Option<UserIdentity>,
    submitting: AtomicBool,
}

impl<B: CheckBackend + 'static> Dispatcher<B> {
    /// Create a dispatcher over a backend
    pub fn new(backend: Arc<B>, config: PipelineConfig) -> Self {
        let side_tasks = SideTaskQueue::spawn(Arc::clone(&backend), config.side_task_capacity);
        Self {
            backend,
            config,
            sink: Arc::new(ResultsSink::new()),
            side_tasks,
            credits: None,
            identity: None,
            submitting: AtomicBool::new(false),
        }
    }

    /// Attach the caller's identity; enables task-id attachment
    pub fn with_identity(mut self, identity: UserIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Attach a credit mirror; each successful check applies the fixed cost
    pub fn with_credit_mirror(mut self, mirror: Arc<CreditMirror<B>>) -> Self {
        self.credits = Some(mirror);
        self
    }

    /// The results sink fed by this dispatcher
    pub fn sink(&self) -> Arc<ResultsSink> {
        Arc::clone(&self.sink)
    }

    /// Counters for the best-effort side tasks
    pub fn side_task_metrics(&self) -> Arc<SideTaskMetrics> {
        self.side_tasks.metrics_handle()
    }

    /// Run one extraction + dispatch cycle
    pub async fn run(
        &self,
        raw_query: &str,
        cancel: &CancelFlag,
    ) -> Result<DispatchSummary, PipelineError> {
        if self
            .submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PipelineError::Busy);
        }
        let _guard = SubmitGuard(&self.submitting);

        // Validation happens before any network call
        let query = SearchQuery::parse(raw_query)?;
        let session_id = SessionId::new();

        info!(session = %session_id, "Starting fact-check cycle");

        let mut claims = self
            .backend
            .extract_claims(query.as_str())
            .await
            .map_err(PipelineError::Extraction)?;
        claims.retain(|claim| claim.validate().is_ok());

        // The original query is the fallback claim
        if claims.is_empty() {
            claims.push(ExtractedClaim::new(query.as_str()));
        }

        let total = claims.len();
        self.sink.begin_cycle(total);
        info!(session = %session_id, claims = total, "Dispatching claims");

        let mut records = Vec::with_capacity(total);
        let mut completed = 0usize;
        let mut cancelled = false;

        for batch in claims.chunks(self.config.batch_size) {
            if cancel.is_cancelled() {
                info!(session = %session_id, completed, total, "Cycle cancelled");
                cancelled = true;
                break;
            }

            let mut set = JoinSet::new();
            for claim in batch {
                let backend = Arc::clone(&self.backend);
                let claim = claim.clone();
                let user_email = self.identity.as_ref().map(|i| i.wallet_id.clone());
                let timeout_secs = self.config.check_timeout_secs;

                set.spawn(async move {
                    let request = CheckRequest {
                        claim: claim.text.clone(),
                        speaker: claim.speaker.clone(),
                        user_email,
                        timeout_secs,
                    };
                    let result = backend.fact_check(&request).await;
                    (claim, result)
                });
            }

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((claim, Ok(outcome))) => {
                        if self.identity.is_some() {
                            if let Some(task_id) = outcome.task_id.as_deref() {
                                self.side_tasks.enqueue(SideTask::AttachTaskId {
                                    session_id: session_id.clone(),
                                    task_id: task_id.to_string(),
                                });
                            }
                        }

                        if let Some(mirror) = &self.credits {
                            mirror.note_check_completed();
                        }

                        // Progressive source announcements stand in when the
                        // final verdict carried none
                        let verdict = outcome.verdict.map(|mut v| {
                            if v.sources.is_empty() {
                                v.sources = outcome.verifying_sources;
                            }
                            v
                        });

                        let record = FactCheckRecord::completed(
                            claim.text,
                            verdict,
                            outcome.raw,
                            outcome.status,
                            session_id.clone(),
                            outcome.task_id,
                        );
                        self.sink.push(record.clone());
                        records.push(record);
                    }
                    Ok((claim, Err(e))) => {
                        warn!(claim = %claim.text, error = %e, "Fact check failed");
                        let record = FactCheckRecord::failed(
                            claim.text,
                            e.to_string(),
                            e.status(),
                            session_id.clone(),
                        );
                        self.sink.push(record.clone());
                        records.push(record);
                    }
                    Err(join_error) => {
                        warn!(error = %join_error, "Fact check task aborted");
                    }
                }
                completed += 1;
            }

            self.sink.report_progress(completed, total);
            debug!(session = %session_id, "Batch complete: {}/{}", completed, total);
        }

        info!(
            session = %session_id,
            completed,
            total,
            cancelled,
            "Fact-check cycle finished"
        );

        Ok(DispatchSummary {
            session_id,
            records,
            claims_total: total,
            cancelled,
        })
    }

    /// Shut down, draining any queued side tasks
    pub async fn shutdown(self) {
        let metrics = self.side_tasks.metrics_handle();
        self.side_tasks.shutdown().await;
        debug!("{}", metrics.summary());
    }
}
