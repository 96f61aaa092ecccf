//! User API endpoints
//!
//! - GET /api/users/approved - approved accounts (any signed-in user)
//! - GET /api/users, /api/users/pending - admin only
//! - PUT /api/users/{id}/approve, DELETE /api/users/{id}/decline - admin only
//! - DELETE /api/users/{id} - admin or the account owner

use axum::{
    extract::State,
    routing::{delete, get, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, ApiPath, AppState, AuthenticatedUser};
use crate::api::responses::{AccountDeletedResponse, MessageBody, UserResponse};
use crate::models::UserFilter;

/// Routes for any authenticated user
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/approved", get(list_approved))
        .route("/users/{id}", delete(delete_user))
}

/// Routes behind the admin check
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_all))
        .route("/users/pending", get(list_pending))
        .route("/users/{id}/approve", put(approve_user))
        .route("/users/{id}/decline", delete(decline_user))
}

async fn list_users(
    state: &AppState,
    user: &AuthenticatedUser,
    filter: UserFilter,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.user_service.list_users(&user.0, filter).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /api/users
async fn list_all(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    list_users(&state, &user, UserFilter::All).await
}

/// GET /api/users/approved
async fn list_approved(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    list_users(&state, &user, UserFilter::Approved).await
}

/// GET /api/users/pending
async fn list_pending(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    list_users(&state, &user, UserFilter::Pending).await
}

/// PUT /api/users/{id}/approve
async fn approve_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageBody>, ApiError> {
    let message = state.user_service.approve_user(&user.0, id).await?;
    Ok(Json(MessageBody::new(message)))
}

/// DELETE /api/users/{id}/decline
async fn decline_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageBody>, ApiError> {
    let message = state.user_service.decline_user(&user.0, id).await?;
    Ok(Json(MessageBody::new(message)))
}

/// DELETE /api/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<AccountDeletedResponse>, ApiError> {
    let outcome = state.user_service.delete_user(&user.0, id).await?;
    Ok(Json(AccountDeletedResponse {
        message: outcome.message,
        session_terminated: outcome.session_terminated,
    }))
}
