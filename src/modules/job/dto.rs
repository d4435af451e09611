use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use super::model::{Job, JobKind, JobStatus};
use crate::modules::session::{OwnerId, Quality};

#[derive(Debug, Serialize, ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub owner: OwnerId,
    pub kind: JobKind,
    pub quality: Quality,
    pub status: JobStatus,
    /// 1-based position in the queue.
    pub position: usize,
    #[serde(with = "time::serde::iso8601")]
    pub created_at: OffsetDateTime,
}

impl JobResponse {
    pub fn from_queued(job: &Job, position: usize) -> Self {
        Self {
            id: job.id,
            owner: job.owner,
            kind: job.kind,
            quality: job.quality,
            status: job.status(),
            position,
            created_at: job.created_at,
        }
    }
}
