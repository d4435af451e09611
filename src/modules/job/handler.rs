use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use super::dto::JobResponse;
use crate::common::response::{ApiResponse, ApiSuccess};
use crate::state::AppState;
use crate::workers::scheduler::{CancelOutcome, SchedulerStatus};

/// Worker activity and queue length
#[utoipa::path(
    get,
    path = "/api/v1/status",
    responses(
        (status = 200, description = "Scheduler status", body = ApiResponse<SchedulerStatus>)
    ),
    tag = "Jobs"
)]
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    ApiSuccess::ok(state.scheduler.status(), "Status retrieved successfully")
}

/// List queued jobs, head first
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    responses(
        (status = 200, description = "Queued jobs", body = ApiResponse<Vec<JobResponse>>)
    ),
    tag = "Jobs"
)]
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    let jobs: Vec<JobResponse> = state
        .scheduler
        .queued()
        .iter()
        .enumerate()
        .map(|(index, job)| JobResponse::from_queued(job, index + 1))
        .collect();

    ApiSuccess::ok(jobs, "Jobs retrieved successfully")
}

/// Cancel a job by id
#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Cancellation outcome", body = ApiResponse<CancelOutcome>)
    ),
    tag = "Jobs"
)]
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let outcome = state.scheduler.cancel_job(id).await;
    let message = match outcome {
        CancelOutcome::Dequeued { .. } => "Job removed from the queue",
        CancelOutcome::Signalled { .. } => "Job will stop at its next checkpoint",
        CancelOutcome::NothingToCancel => "Nothing to cancel",
    };
    ApiSuccess::ok(outcome, message)
}
