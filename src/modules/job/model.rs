use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::modules::session::{OwnerId, Quality, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Compress,
    ExtractAudio,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Compress => write!(f, "compress"),
            JobKind::ExtractAudio => write!(f, "extract_audio"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    fn can_advance_to(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Queued => matches!(next, JobStatus::Running | JobStatus::Cancelled),
            JobStatus::Running => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One unit of requested work. Everything but the status is fixed at creation.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub owner: OwnerId,
    pub kind: JobKind,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Only meaningful for [`JobKind::Compress`].
    pub quality: Quality,
    pub created_at: OffsetDateTime,
    status: JobStatus,
}

impl Job {
    pub fn new(
        owner: OwnerId,
        kind: JobKind,
        input_path: PathBuf,
        quality: Quality,
        work_dir: &Path,
    ) -> Self {
        let id = Uuid::new_v4();
        let output_name = match kind {
            JobKind::Compress => format!("{}_compressed.mp4", id.simple()),
            JobKind::ExtractAudio => format!("{}_audio.mp3", id.simple()),
        };

        Self {
            id,
            owner,
            kind,
            input_path,
            output_path: work_dir.join(output_name),
            quality,
            created_at: OffsetDateTime::now_utc(),
            status: JobStatus::Queued,
        }
    }

    /// Builds a job that takes over the session's artifact.
    pub fn from_session(session: Session, kind: JobKind, work_dir: &Path) -> Self {
        Self::new(
            session.owner,
            kind,
            session.input_path,
            session.quality,
            work_dir,
        )
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Applies a lifecycle transition. Invalid transitions leave the job as is
    /// and return `false`; a terminal status is never left again.
    pub(crate) fn advance(&mut self, next: JobStatus) -> bool {
        if !self.status.can_advance_to(next) {
            return false;
        }
        self.status = next;
        true
    }
}

/// Status transition broadcast by the scheduler.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobEvent {
    pub job_id: Uuid,
    pub owner: OwnerId,
    pub kind: JobKind,
    pub status: JobStatus,
    #[serde(with = "time::serde::iso8601")]
    pub at: OffsetDateTime,
}

impl JobEvent {
    pub fn of(job: &Job) -> Self {
        Self {
            job_id: job.id,
            owner: job.owner,
            kind: job.kind,
            status: job.status,
            at: OffsetDateTime::now_utc(),
        }
    }
}
