use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::infrastructure::messaging::Messenger;
use crate::modules::job::Job;

/// Publishes checkpoint percentages for the running job.
///
/// Implementations never fail the job: delivery problems are logged.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, job: &Job, percent: u8);

    /// Called once after the job's terminal transition.
    async fn finish(&self, _job: &Job) {}
}

/// Sends progress through the messenger, editing one message per job.
///
/// Updates are last-write-wins: a percentage at or below the highest one
/// already accepted for the job is dropped, so a late update can never roll
/// the displayed value back.
pub struct MessengerProgressReporter {
    messenger: Arc<dyn Messenger>,
    accepted: Mutex<HashMap<Uuid, u8>>,
}

impl MessengerProgressReporter {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self {
            messenger,
            accepted: Mutex::new(HashMap::new()),
        }
    }

    /// Records `percent` if it advances the job; returns whether it did.
    fn accept(&self, job_id: Uuid, percent: u8) -> bool {
        let mut accepted = self.accepted.lock();
        match accepted.get(&job_id) {
            Some(last) if *last >= percent => false,
            _ => {
                accepted.insert(job_id, percent);
                true
            }
        }
    }
}

#[async_trait]
impl ProgressReporter for MessengerProgressReporter {
    async fn report(&self, job: &Job, percent: u8) {
        let percent = percent.min(100);
        if !self.accept(job.id, percent) {
            debug!(job_id = %job.id, percent, "Dropping stale progress update");
            return;
        }

        if let Err(e) = self.messenger.send_progress(job.owner, job.id, percent).await {
            warn!(job_id = %job.id, percent, error = %e, "Progress delivery failed");
        }
    }

    async fn finish(&self, job: &Job) {
        self.accepted.lock().remove(&job.id);
    }
}
