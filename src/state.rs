use std::sync::Arc;

use crate::config::AppConfig;
use crate::infrastructure::messaging::{ChannelMessenger, Messenger};
use crate::infrastructure::transcoder::Transcoder;
use crate::modules::session::SessionStore;
use crate::workers::progress::MessengerProgressReporter;
use crate::workers::scheduler::{Scheduler, SchedulerSettings};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionStore>,
    pub scheduler: Scheduler,
    /// Outbound channel used by the bot and the worker.
    pub messenger: Arc<dyn Messenger>,
    /// Feed behind the chat WebSocket.
    pub hub: ChannelMessenger,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        sessions: SessionStore,
        scheduler: Scheduler,
        messenger: Arc<dyn Messenger>,
        hub: ChannelMessenger,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            scheduler,
            messenger,
            hub,
        }
    }

    /// Wires the production collaborators: every outbound message goes
    /// through the in-process hub.
    pub fn build(config: AppConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        let hub = ChannelMessenger::new();
        let messenger: Arc<dyn Messenger> = Arc::new(hub.clone());
        let progress = Arc::new(MessengerProgressReporter::new(messenger.clone()));
        let scheduler = Scheduler::new(
            transcoder,
            messenger.clone(),
            progress,
            SchedulerSettings::from_config(&config),
        );
        let sessions = SessionStore::new(config.default_quality);

        Self::new(config, sessions, scheduler, messenger, hub)
    }
}
