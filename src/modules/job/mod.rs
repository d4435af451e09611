use axum::Router;
use axum::routing::{delete, get};

use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod model;
pub mod queue;

pub use model::{Job, JobEvent, JobKind, JobStatus};
pub use queue::JobQueue;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(handler::get_status))
        .route("/jobs", get(handler::list_jobs))
        .route("/jobs/{id}", delete(handler::cancel_job))
}
