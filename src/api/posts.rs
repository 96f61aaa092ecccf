//! Post API endpoints
//!
//! Public:
//! - GET /api/posts/approved?type=lost|found
//!
//! Authenticated:
//! - POST /api/posts - submit a post
//! - GET /api/posts/{id}
//!
//! Admin:
//! - GET /api/posts/pending?type=lost|found
//! - PUT /api/posts/{id} - edit content
//! - DELETE /api/posts/{id}
//! - PUT /api/posts/{id}/approve
//! - DELETE /api/posts/{id}/decline

use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser};
use crate::api::responses::{MessageBody, PostCreatedResponse, PostResponse};
use crate::models::{PostType, PostWithAuthor};
use crate::services::CreatePostInput;

/// Listing filter
#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    #[serde(rename = "type")]
    pub post_type: Option<PostType>,
}

/// Request body for creating a post
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(rename = "type")]
    pub post_type: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Request body for editing a post or comment
#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/posts/approved", get(list_approved))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/{id}", get(get_post))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/posts/pending", get(list_pending))
        .route("/posts/{id}", put(update_post).delete(delete_post))
        .route("/posts/{id}/approve", put(approve_post))
        .route("/posts/{id}/decline", delete(decline_post))
}

fn to_responses(posts: Vec<PostWithAuthor>) -> Vec<PostResponse> {
    posts.into_iter().map(PostResponse::from).collect()
}

/// GET /api/posts/approved
async fn list_approved(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PostListQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let posts = state.post_service.list_approved(query.post_type).await?;
    Ok(Json(to_responses(posts)))
}

/// GET /api/posts/pending
async fn list_pending(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<PostListQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let posts = state.post_service.list_pending(&user.0, query.post_type).await?;
    Ok(Json(to_responses(posts)))
}

/// POST /api/posts
async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreatePostRequest>,
) -> Result<Json<PostCreatedResponse>, ApiError> {
    let submission = state
        .post_service
        .create(
            &user.0,
            CreatePostInput {
                post_type: body.post_type,
                content: body.content,
                image: body.image,
            },
        )
        .await?;

    Ok(Json(PostCreatedResponse {
        post: submission.post.into(),
        message: submission.message,
    }))
}

/// GET /api/posts/{id}
async fn get_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.get(&user.0, id).await?;
    Ok(Json(post.into()))
}

/// PUT /api/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ContentRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .post_service
        .update_content(&user.0, id, &body.content)
        .await?;
    Ok(Json(post.into()))
}

/// DELETE /api/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageBody>, ApiError> {
    let message = state.post_service.delete(&user.0, id).await?;
    Ok(Json(MessageBody::new(message)))
}

/// PUT /api/posts/{id}/approve
async fn approve_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageBody>, ApiError> {
    let message = state.post_service.approve(&user.0, id).await?;
    Ok(Json(MessageBody::new(message)))
}

/// DELETE /api/posts/{id}/decline
async fn decline_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageBody>, ApiError> {
    let message = state.post_service.decline(&user.0, id).await?;
    Ok(Json(MessageBody::new(message)))
}
