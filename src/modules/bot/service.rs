use std::path::PathBuf;

use tracing::{info, warn};

use super::command::{self, Command};
use super::dto::{CommandOutcome, SessionResponse};
use crate::common::artifact;
use crate::common::error::SessionError;
use crate::infrastructure::messaging::MenuOption;
use crate::modules::job::{Job, JobKind};
use crate::modules::session::OwnerId;
use crate::state::AppState;
use crate::workers::scheduler::CancelOutcome;

const GREETING: &str =
    "Hi! I compress videos and extract their audio track. Send me a video to get started.";
const NEED_UPLOAD: &str = "Send me a video first.";

/// Chat flow: uploads open a session, menu commands act on it.
pub struct BotService;

impl BotService {
    pub async fn handle_upload(
        state: &AppState,
        owner: OwnerId,
        input_path: PathBuf,
    ) -> SessionResponse {
        let response = SessionResponse::new(owner, &input_path, state.sessions.default_quality());
        if let Some(previous) = state.sessions.put(owner, input_path) {
            info!(%owner, path = %previous.input_path.display(), "Upload superseded an unused one");
            artifact::discard(&previous.input_path).await;
        }

        Self::show_main_menu(state, owner).await;
        response
    }

    pub async fn handle_command(
        state: &AppState,
        owner: OwnerId,
        command: Command,
    ) -> Result<CommandOutcome, SessionError> {
        match command {
            Command::Start => {
                Self::notice(state, owner, GREETING).await;
                Ok(CommandOutcome::Greeted)
            }
            Command::Compress => Self::submit(state, owner, JobKind::Compress).await,
            Command::ExtractAudio => Self::submit(state, owner, JobKind::ExtractAudio).await,
            Command::ChooseQuality => {
                Self::require_session(state, owner).await?;
                Self::menu(state, owner, "Choose the quality:", &command::quality_menu()).await;
                Ok(CommandOutcome::MenuShown)
            }
            Command::SetQuality(quality) => {
                if let Err(e) = state.sessions.set_quality(owner, quality) {
                    Self::notice(state, owner, NEED_UPLOAD).await;
                    return Err(e);
                }
                Self::notice(state, owner, &format!("Quality set to {quality}.")).await;
                Self::show_main_menu(state, owner).await;
                Ok(CommandOutcome::QualitySet { quality })
            }
            Command::CancelTask => {
                let outcome = state.scheduler.request_cancel(owner).await;
                let text = match outcome {
                    CancelOutcome::Dequeued { count } => {
                        format!("Removed {count} queued task(s).")
                    }
                    CancelOutcome::Signalled { .. } => {
                        "Your running task will stop at the next checkpoint.".to_string()
                    }
                    CancelOutcome::NothingToCancel => "Nothing to cancel.".to_string(),
                };
                Self::notice(state, owner, &text).await;
                Ok(CommandOutcome::Cancel { outcome })
            }
        }
    }

    /// Turns the owner's session into a queued job.
    async fn submit(
        state: &AppState,
        owner: OwnerId,
        kind: JobKind,
    ) -> Result<CommandOutcome, SessionError> {
        let session = match state.sessions.take(owner) {
            Ok(session) => session,
            Err(e) => {
                Self::notice(state, owner, NEED_UPLOAD).await;
                return Err(e);
            }
        };

        let job = Job::from_session(session, kind, &state.config.work_dir);
        let job_id = job.id;
        let processing = state.scheduler.status().processing;
        let position = state.scheduler.enqueue(job);

        let queue_name = match kind {
            JobKind::Compress => "compression",
            JobKind::ExtractAudio => "audio extraction",
        };
        let text = if processing {
            format!("The bot is busy. Your video was added to the {queue_name} queue at position {position}.")
        } else {
            format!("Your video was added to the {queue_name} queue.")
        };
        Self::notice(state, owner, &text).await;

        Ok(CommandOutcome::Queued { job_id, position })
    }

    async fn require_session(state: &AppState, owner: OwnerId) -> Result<(), SessionError> {
        if let Err(e) = state.sessions.get(owner) {
            Self::notice(state, owner, NEED_UPLOAD).await;
            return Err(e);
        }
        Ok(())
    }

    async fn show_main_menu(state: &AppState, owner: OwnerId) {
        Self::menu(state, owner, "Choose an option:", &command::main_menu()).await;
    }

    async fn menu(state: &AppState, owner: OwnerId, text: &str, options: &[MenuOption]) {
        if let Err(e) = state.messenger.send_menu(owner, text, options).await {
            warn!(%owner, error = %e, "Menu delivery failed");
        }
    }

    async fn notice(state: &AppState, owner: OwnerId, text: &str) {
        if let Err(e) = state.messenger.send_notice(owner, text).await {
            warn!(%owner, error = %e, "Notice delivery failed");
        }
    }
}
