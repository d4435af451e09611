use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::common::artifact;
use crate::modules::session::SessionStore;

/// Reclaims uploads whose session sat idle for longer than `ttl`.
pub fn spawn(
    sessions: Arc<SessionStore>,
    ttl: Duration,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?ttl, ?every, "Session janitor started");
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => { sweep(&sessions, ttl).await; }
            }
        }
        debug!("Session janitor stopped");
    })
}

/// Returns how many sessions were dropped.
pub async fn sweep(sessions: &SessionStore, ttl: Duration) -> usize {
    let expired = sessions.sweep_expired(ttl);
    for session in &expired {
        info!(owner = %session.owner, "Session expired");
        artifact::discard(&session.input_path).await;
    }
    expired.len()
}
