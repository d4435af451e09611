use std::collections::VecDeque;

use parking_lot::Mutex;
use uuid::Uuid;

use super::model::Job;
use crate::common::error::QueueError;
use crate::modules::session::OwnerId;

/// FIFO of jobs waiting for the worker.
///
/// Every operation takes the same lock, so producers racing with the worker
/// never observe or produce a reordered queue.
#[derive(Debug, Default)]
pub struct JobQueue {
    pending: Mutex<VecDeque<Job>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `job` and returns its 1-based position.
    ///
    /// A job that is already queued keeps its place.
    pub fn enqueue(&self, job: Job) -> usize {
        let mut pending = self.pending.lock();
        if let Some(index) = pending.iter().position(|j| j.id == job.id) {
            return index + 1;
        }
        pending.push_back(job);
        pending.len()
    }

    pub fn dequeue_next(&self) -> Result<Job, QueueError> {
        self.pending.lock().pop_front().ok_or(QueueError::Empty)
    }

    /// Removes every queued job of `owner`, in queue order.
    pub fn cancel_by_owner(&self, owner: OwnerId) -> Vec<Job> {
        let mut pending = self.pending.lock();
        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(pending.len());
        for job in pending.drain(..) {
            if job.owner == owner {
                removed.push(job);
            } else {
                kept.push_back(job);
            }
        }
        *pending = kept;
        removed
    }

    pub fn cancel_by_id(&self, id: Uuid) -> Option<Job> {
        let mut pending = self.pending.lock();
        let index = pending.iter().position(|j| j.id == id)?;
        pending.remove(index)
    }

    pub fn snapshot(&self) -> Vec<Job> {
        self.pending.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
