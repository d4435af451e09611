use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use tracing::{debug, error, info, warn};

use super::command::Command;
use super::dto::{CommandOutcome, CommandRequest, SessionResponse};
use super::service::BotService;
use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::common::upload::stream_to_disk;
use crate::infrastructure::messaging::{OutboundMessage, Subscription};
use crate::modules::session::OwnerId;
use crate::state::AppState;

/// Upload a video for a chat
///
/// Streams the `video` field to the work directory and opens a new session,
/// replacing any unused previous upload.
#[utoipa::path(
    post,
    path = "/api/v1/chats/{owner}/uploads",
    params(
        ("owner" = i64, Path, description = "Chat ID")
    ),
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upload stored", body = ApiResponse<SessionResponse>),
        (status = 400, description = "Bad Request")
    ),
    tag = "Chat"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    Path(owner): Path<i64>,
    mut multipart: Multipart,
) -> Result<ApiSuccess<SessionResponse>, ApiError> {
    let owner = OwnerId(owner);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() != Some("video") {
            continue;
        }

        info!(%owner, file_name = ?field.file_name(), "Receiving upload");
        let path = stream_to_disk(&state.config.work_dir, field)
            .await
            .map_err(|e| ApiError::bad_request(format!("Upload failed: {e}")))?;

        let session = BotService::handle_upload(&state, owner, path).await;
        return Ok(ApiSuccess::ok(session, "Video uploaded successfully"));
    }

    Err(ApiError::bad_request(
        "No video field found in multipart request",
    ))
}

/// Send a menu command
#[utoipa::path(
    post,
    path = "/api/v1/chats/{owner}/commands",
    params(
        ("owner" = i64, Path, description = "Chat ID")
    ),
    request_body = CommandRequest,
    responses(
        (status = 202, description = "Command accepted", body = ApiResponse<CommandOutcome>),
        (status = 400, description = "Unknown command"),
        (status = 404, description = "No uploaded video for this chat")
    ),
    tag = "Chat"
)]
pub async fn send_command(
    State(state): State<AppState>,
    Path(owner): Path<i64>,
    Json(req): Json<CommandRequest>,
) -> Result<ApiSuccess<CommandOutcome>, ApiError> {
    let command: Command = req.data.parse()?;
    let outcome = BotService::handle_command(&state, OwnerId(owner), command).await?;
    Ok(ApiSuccess::accepted(outcome, "Command accepted"))
}

/// Current session of a chat
#[utoipa::path(
    get,
    path = "/api/v1/chats/{owner}/session",
    params(
        ("owner" = i64, Path, description = "Chat ID")
    ),
    responses(
        (status = 200, description = "Session details", body = ApiResponse<SessionResponse>),
        (status = 404, description = "No session")
    ),
    tag = "Chat"
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(owner): Path<i64>,
) -> Result<ApiSuccess<SessionResponse>, ApiError> {
    let session = state.sessions.get(OwnerId(owner))?;
    Ok(ApiSuccess::ok(
        SessionResponse::from(session),
        "Session retrieved successfully",
    ))
}

/// Outbound message stream of a chat.
///
/// Every message is a JSON text frame; a `result` frame is followed by one
/// binary frame holding the artifact.
pub async fn chat_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(owner): Path<i64>,
) -> impl IntoResponse {
    let subscription = state.hub.subscribe(OwnerId(owner));
    ws.on_upgrade(move |socket| forward(socket, subscription))
}

async fn forward(mut socket: WebSocket, mut subscription: Subscription) {
    loop {
        tokio::select! {
            outbound = subscription.recv() => {
                let Some(message) = outbound else { break };
                if let Err(e) = send_outbound(&mut socket, message).await {
                    debug!(error = %e, "Chat socket closed while sending");
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!(error = %e, "Chat socket error");
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn send_outbound(socket: &mut WebSocket, message: OutboundMessage) -> Result<(), axum::Error> {
    let frames = match frames(message) {
        Ok(frames) => frames,
        Err(e) => {
            error!(error = %e, "Cannot encode outbound message, skipping it");
            return Ok(());
        }
    };
    for frame in frames {
        socket.send(frame).await?;
    }
    Ok(())
}

/// JSON header, plus the artifact bytes for results.
fn frames(message: OutboundMessage) -> serde_json::Result<Vec<Message>> {
    let header = serde_json::to_string(&message)?;
    let mut frames = vec![Message::Text(header.into())];
    if let OutboundMessage::Result { data, .. } = message {
        frames.push(Message::Binary(data));
    }
    Ok(frames)
}
