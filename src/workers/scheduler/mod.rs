//! Single-worker job scheduler.
//!
//! Request handlers push jobs into the [`JobQueue`] and signal cancellation;
//! one long-lived worker task drains the queue strictly in FIFO order and
//! drives each job to exactly one terminal status before claiming the next.
//!
//! Cancellation is cooperative. The worker looks at the running job's
//! cancellation token only at checkpoints: before each simulated progress
//! step, right before the transcode call and right after it returns. The
//! transcode call itself is never interrupted by a cancel request.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::artifact;
use crate::common::error::{QueueError, TranscodeError};
use crate::config::AppConfig;
use crate::infrastructure::messaging::Messenger;
use crate::infrastructure::transcoder::Transcoder;
use crate::modules::job::{Job, JobEvent, JobKind, JobQueue, JobStatus};
use crate::modules::session::OwnerId;
use crate::workers::progress::ProgressReporter;


const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Progress percentages; all but the last are reported before the
    /// transcode call, the last one after it succeeds.
    pub checkpoints: Vec<u8>,
    /// Pause after each pre-transcode checkpoint.
    pub step_delay: Duration,
    /// Watchdog around the transcode call.
    pub transcode_timeout: Option<Duration>,
}

impl SchedulerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            checkpoints: config.progress_checkpoints.clone(),
            step_delay: config.progress_step,
            transcode_timeout: config.transcode_timeout,
        }
    }
}

/// Read-only view for the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SchedulerStatus {
    pub processing: bool,
    pub queue_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CancelOutcome {
    /// Queued jobs removed before they started.
    Dequeued { count: usize },
    /// The running job will stop at its next checkpoint.
    Signalled { job_id: Uuid },
    NothingToCancel,
}

struct ActiveJob {
    id: Uuid,
    owner: OwnerId,
    cancel: CancellationToken,
}

enum SchedulerState {
    Idle,
    Running(ActiveJob),
}

enum Outcome {
    Completed(PathBuf),
    Failed(TranscodeError),
    Cancelled,
}

impl Outcome {
    fn status(&self) -> JobStatus {
        match self {
            Outcome::Completed(_) => JobStatus::Completed,
            Outcome::Failed(_) => JobStatus::Failed,
            Outcome::Cancelled => JobStatus::Cancelled,
        }
    }
}

struct Inner {
    queue: JobQueue,
    // Lock order: state, then queue.
    state: Mutex<SchedulerState>,
    wake: Notify,
    transcoder: Arc<dyn Transcoder>,
    messenger: Arc<dyn Messenger>,
    progress: Arc<dyn ProgressReporter>,
    events: broadcast::Sender<JobEvent>,
    settings: SchedulerSettings,
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        messenger: Arc<dyn Messenger>,
        progress: Arc<dyn ProgressReporter>,
        settings: SchedulerSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                queue: JobQueue::new(),
                state: Mutex::new(SchedulerState::Idle),
                wake: Notify::new(),
                transcoder,
                messenger,
                progress,
                events,
                settings,
            }),
        }
    }

    /// Starts the worker task. It runs until `shutdown` fires, finishing the
    /// current job first.
    pub fn spawn(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    }

    /// Queues `job` and returns its 1-based queue position.
    pub fn enqueue(&self, job: Job) -> usize {
        let event = JobEvent::of(&job);
        let position = self.inner.queue.enqueue(job);
        info!(
            job_id = %event.job_id,
            owner = %event.owner,
            kind = %event.kind,
            position,
            "Job queued"
        );
        let _ = self.inner.events.send(event);
        self.inner.wake.notify_one();
        position
    }

    /// Cancels the owner's queued jobs, or failing that, signals the owner's
    /// running job.
    pub async fn request_cancel(&self, owner: OwnerId) -> CancelOutcome {
        let removed = {
            let state = self.inner.state.lock();
            let removed = self.inner.queue.cancel_by_owner(owner);
            if removed.is_empty() {
                return match &*state {
                    SchedulerState::Running(active) if active.owner == owner => {
                        Self::signal(active)
                    }
                    _ => CancelOutcome::NothingToCancel,
                };
            }
            removed
        };

        let count = removed.len();
        for job in removed {
            self.finish_unstarted(job).await;
        }
        CancelOutcome::Dequeued { count }
    }

    pub async fn cancel_job(&self, id: Uuid) -> CancelOutcome {
        let removed = {
            let state = self.inner.state.lock();
            match self.inner.queue.cancel_by_id(id) {
                Some(job) => job,
                None => {
                    return match &*state {
                        SchedulerState::Running(active) if active.id == id => Self::signal(active),
                        _ => CancelOutcome::NothingToCancel,
                    };
                }
            }
        };

        self.finish_unstarted(removed).await;
        CancelOutcome::Dequeued { count: 1 }
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.inner.state.lock();
        SchedulerStatus {
            processing: matches!(*state, SchedulerState::Running(_)),
            queue_length: self.inner.queue.len(),
        }
    }

    /// Jobs waiting to run, head first.
    pub fn queued(&self) -> Vec<Job> {
        self.inner.queue.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    fn signal(active: &ActiveJob) -> CancelOutcome {
        active.cancel.cancel();
        info!(job_id = %active.id, owner = %active.owner, "Cancellation requested for running job");
        CancelOutcome::Signalled { job_id: active.id }
    }

    /// Terminal path for a job removed from the queue before it started.
    async fn finish_unstarted(&self, mut job: Job) {
        job.advance(JobStatus::Cancelled);
        info!(job_id = %job.id, owner = %job.owner, "Queued job cancelled");
        artifact::discard(&job.input_path).await;
        let _ = self.inner.events.send(JobEvent::of(&job));
    }

    async fn run(self, shutdown: CancellationToken) {
        info!("Scheduler worker started");

        while !shutdown.is_cancelled() {
            match self.claim_next() {
                Ok(Some((job, cancel))) => {
                    let span = info_span!(
                        "job",
                        job_id = %job.id,
                        owner = %job.owner,
                        kind = %job.kind
                    );
                    self.drive(job, cancel).instrument(span).await;
                }
                Ok(None) => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = self.inner.wake.notified() => {}
                    }
                }
                Err(e) => {
                    error!(error = %e, "Job queue emptied under the worker, stopping");
                    break;
                }
            }
        }

        info!("Scheduler worker stopped");
    }

    /// Idle -> Running: takes the queue head under the state lock.
    fn claim_next(&self) -> Result<Option<(Job, CancellationToken)>, QueueError> {
        let mut state = self.inner.state.lock();
        debug_assert!(matches!(*state, SchedulerState::Idle));

        if self.inner.queue.is_empty() {
            return Ok(None);
        }
        let mut job = self.inner.queue.dequeue_next()?;
        job.advance(JobStatus::Running);

        let cancel = CancellationToken::new();
        *state = SchedulerState::Running(ActiveJob {
            id: job.id,
            owner: job.owner,
            cancel: cancel.clone(),
        });
        let _ = self.inner.events.send(JobEvent::of(&job));
        Ok(Some((job, cancel)))
    }

    async fn drive(&self, mut job: Job, cancel: CancellationToken) {
        info!(quality = %job.quality, "Job started");

        let outcome = self.execute(&job, &cancel).await;
        job.advance(outcome.status());

        let produced = match outcome {
            Outcome::Completed(output) => {
                info!("Job completed");
                self.deliver(&job, &output).await;
                Some(output)
            }
            Outcome::Failed(e) => {
                warn!(error = %e, "Job failed");
                self.notify_error(&job, &format!("Processing failed: {e}"))
                    .await;
                None
            }
            Outcome::Cancelled => {
                info!("Job cancelled");
                if let Err(e) = self
                    .inner
                    .messenger
                    .send_notice(job.owner, "Your task was cancelled.")
                    .await
                {
                    warn!(error = %e, "Could not confirm cancellation");
                }
                None
            }
        };

        self.cleanup(&job, produced.as_deref()).await;
        self.inner.progress.finish(&job).await;

        *self.inner.state.lock() = SchedulerState::Idle;
        let _ = self.inner.events.send(JobEvent::of(&job));
    }

    async fn execute(&self, job: &Job, cancel: &CancellationToken) -> Outcome {
        let (last, leading) = match self.inner.settings.checkpoints.split_last() {
            Some((last, leading)) => (Some(*last), leading),
            None => (None, &[][..]),
        };

        for &percent in leading {
            if cancel.is_cancelled() {
                return Outcome::Cancelled;
            }
            self.inner.progress.report(job, percent).await;
            self.pace(cancel).await;
        }

        if cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        match self.transcode(job).await {
            Err(e) => {
                if cancel.is_cancelled() {
                    info!("Transcode failed before the pending cancellation applied");
                }
                Outcome::Failed(e)
            }
            // A cancel that arrived during the opaque call lands here; the
            // output is dropped by cleanup.
            Ok(_) if cancel.is_cancelled() => Outcome::Cancelled,
            Ok(output) => {
                if let Some(percent) = last {
                    self.inner.progress.report(job, percent).await;
                }
                Outcome::Completed(output)
            }
        }
    }

    async fn pace(&self, cancel: &CancellationToken) {
        let delay = self.inner.settings.step_delay;
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {}
        }
    }

    async fn transcode(&self, job: &Job) -> Result<PathBuf, TranscodeError> {
        let transcoder = &self.inner.transcoder;
        let call = async {
            match job.kind {
                JobKind::Compress => {
                    transcoder
                        .compress(&job.input_path, &job.output_path, job.quality)
                        .await
                }
                JobKind::ExtractAudio => {
                    transcoder
                        .extract_audio(&job.input_path, &job.output_path)
                        .await
                }
            }
        };

        match self.inner.settings.transcode_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(TranscodeError::Timeout(limit))),
            None => call.await,
        }
    }

    async fn deliver(&self, job: &Job, output: &Path) {
        if let Err(e) = self
            .inner
            .messenger
            .send_result(job.owner, job.kind, output)
            .await
        {
            warn!(error = %e, "Result delivery failed");
            self.notify_error(job, "Your file is ready but could not be delivered.")
                .await;
        }
    }

    async fn notify_error(&self, job: &Job, message: &str) {
        if let Err(e) = self.inner.messenger.send_error(job.owner, message).await {
            warn!(error = %e, "Could not report error to owner");
        }
    }

    /// One pass over every artifact the job may have left behind.
    async fn cleanup(&self, job: &Job, produced: Option<&Path>) {
        artifact::discard(&job.input_path).await;
        artifact::discard(&job.output_path).await;
        if let Some(path) = produced.filter(|p| *p != job.output_path) {
            artifact::discard(path).await;
        }
        debug!("Artifacts cleaned up");
    }
}
