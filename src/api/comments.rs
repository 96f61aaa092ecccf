//! Comment API endpoints
//!
//! - GET /api/comments/post/{post_id} - comments on a post, oldest first
//! - POST /api/comments - add a comment
//! - PUT /api/comments/{id} - edit a comment (author or admin)

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, ApiJson, ApiPath, AppState, AuthenticatedUser};
use crate::api::posts::ContentRequest;
use crate::api::responses::CommentResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: i64,
    pub content: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments/post/{post_id}", get(list_comments))
        .route("/comments", post(create_comment))
        .route("/comments/{id}", put(update_comment))
}

async fn list_comments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(post_id): ApiPath<i64>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let comments = state.comment_service.list_for_post(&user.0, post_id).await?;
    Ok(Json(comments.into_iter().map(CommentResponse::from).collect()))
}

async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateCommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state
        .comment_service
        .create(&user.0, body.post_id, &body.content)
        .await?;
    Ok(Json(comment.into()))
}

async fn update_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ContentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state
        .comment_service
        .update_content(&user.0, id, &body.content)
        .await?;
    Ok(Json(comment.into()))
}
