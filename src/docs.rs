use utoipa::OpenApi;

use crate::modules::bot::dto::{CommandOutcome, CommandRequest, SessionResponse};
use crate::modules::job::dto::JobResponse;
use crate::modules::job::{JobKind, JobStatus};
use crate::modules::session::{OwnerId, Quality};
use crate::workers::scheduler::{CancelOutcome, SchedulerStatus};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::bot::handler::upload_video,
        crate::modules::bot::handler::send_command,
        crate::modules::bot::handler::get_session,
        crate::modules::job::handler::get_status,
        crate::modules::job::handler::list_jobs,
        crate::modules::job::handler::cancel_job,
    ),
    components(
        schemas(
            CommandRequest, CommandOutcome, SessionResponse,
            JobResponse, JobKind, JobStatus,
            OwnerId, Quality,
            SchedulerStatus, CancelOutcome,
        )
    ),
    tags(
        (name = "Chat", description = "Uploads and menu commands"),
        (name = "Jobs", description = "Transcode queue")
    )
)]
pub struct ApiDoc;
