use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::modules::session::model::OwnerId;

/// Requester acted before uploading anything.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no active session for owner {0}")]
    NoSession(OwnerId),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("job queue is empty")]
    Empty,
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to start transcoder: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("transcoder exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("transcoder did not finish within {0:?}")]
    Timeout(Duration),

    #[error("transcoder reported success but {0} is missing")]
    MissingOutput(PathBuf),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("owner {0} has no connected channel")]
    Unreachable(OwnerId),

    #[error("channel of owner {0} is not draining its messages")]
    Backlogged(OwnerId),

    #[error("failed to read artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
#[error("failed to remove {path}: {source}")]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("unknown quality: {0}")]
    UnknownQuality(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PROGRESS_CHECKPOINTS must be increasing percentages, got {0:?}")]
    InvalidCheckpoints(String),
}
