use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::modules::session::{OwnerId, Quality, Session};
use crate::workers::scheduler::CancelOutcome;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommandRequest {
    /// Callback data, e.g. `compress` or `quality_480p`.
    pub data: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub owner: OwnerId,
    pub file_name: String,
    pub quality: Quality,
    #[serde(with = "time::serde::iso8601::option")]
    pub uploaded_at: Option<OffsetDateTime>,
}

impl SessionResponse {
    pub fn new(owner: OwnerId, input_path: &Path, quality: Quality) -> Self {
        Self {
            owner,
            file_name: file_name(input_path),
            quality,
            uploaded_at: None,
        }
    }
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            owner: s.owner,
            file_name: file_name(&s.input_path),
            quality: s.quality,
            uploaded_at: Some(s.uploaded_at),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandOutcome {
    Greeted,
    MenuShown,
    Queued { job_id: Uuid, position: usize },
    QualitySet { quality: Quality },
    Cancel { outcome: CancelOutcome },
}
