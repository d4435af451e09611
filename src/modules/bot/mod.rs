use axum::Router;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;

use crate::state::AppState;

pub mod command;
pub mod dto;
pub mod handler;
pub mod service;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    let uploads = Router::new()
        .route("/{owner}/uploads", post(handler::upload_video))
        .layer(axum::extract::DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes));

    Router::new()
        .route("/{owner}/commands", post(handler::send_command))
        .route("/{owner}/session", get(handler::get_session))
        .route("/{owner}/ws", get(handler::chat_socket))
        .merge(uploads)
}
