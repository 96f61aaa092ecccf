//! Direct message API endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, ApiJson, ApiPath, AppState, AuthenticatedUser};
use crate::api::responses::MessageResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub recipient_id: i64,
    pub content: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages/user/{user_id}", get(list_messages))
        .route("/messages", post(send_message))
}

/// GET /api/messages/user/{user_id}
///
/// Sent and received messages, newest first.
async fn list_messages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let messages = state.message_service.list_for_user(&user.0, user_id).await?;
    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

/// POST /api/messages
async fn send_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<SendMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = state
        .message_service
        .send(&user.0, body.recipient_id, &body.content)
        .await?;
    Ok(Json(message.into()))
}
