use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

use super::model::{OwnerId, Quality, Session};
use crate::common::error::SessionError;

/// Per-requester record of the latest upload and chosen quality.
///
/// Only request handlers and the session janitor touch this store; the
/// scheduler never does.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<OwnerId, Session>>,
    default_quality: Quality,
}

impl SessionStore {
    pub fn new(default_quality: Quality) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            default_quality,
        }
    }

    /// Replaces any previous session of `owner`, resetting the quality to the
    /// default. Returns the replaced session so its artifact can be reclaimed.
    pub fn put(&self, owner: OwnerId, input_path: PathBuf) -> Option<Session> {
        let session = Session::new(owner, input_path, self.default_quality);
        self.sessions.write().insert(owner, session)
    }

    pub fn set_quality(&self, owner: OwnerId, quality: Quality) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(&owner)
            .ok_or(SessionError::NoSession(owner))?;
        session.quality = quality;
        session.touched = Instant::now();
        Ok(())
    }

    pub fn get(&self, owner: OwnerId) -> Result<Session, SessionError> {
        self.sessions
            .read()
            .get(&owner)
            .cloned()
            .ok_or(SessionError::NoSession(owner))
    }

    /// Removes the session, handing its artifact over to the caller.
    pub fn take(&self, owner: OwnerId) -> Result<Session, SessionError> {
        self.sessions
            .write()
            .remove(&owner)
            .ok_or(SessionError::NoSession(owner))
    }

    /// Drops sessions idle for longer than `ttl` and returns them.
    pub fn sweep_expired(&self, ttl: Duration) -> Vec<Session> {
        self.sweep_expired_at(Instant::now(), ttl)
    }

    pub(crate) fn sweep_expired_at(&self, now: Instant, ttl: Duration) -> Vec<Session> {
        let mut sessions = self.sessions.write();
        let expired: Vec<OwnerId> = sessions
            .values()
            .filter(|s| now.saturating_duration_since(s.touched) > ttl)
            .map(|s| s.owner)
            .collect();

        expired
            .into_iter()
            .filter_map(|owner| sessions.remove(&owner))
            .collect()
    }

    pub fn default_quality(&self) -> Quality {
        self.default_quality
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
