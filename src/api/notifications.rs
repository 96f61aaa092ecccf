//! Notification API endpoints

use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, ApiPath, AppState, AuthenticatedUser};
use crate::api::responses::{CountResponse, NotificationResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications/user/{user_id}", get(list_notifications))
        .route("/notifications/user/{user_id}/unread-count", get(unread_count))
        .route("/notifications/{id}/read", put(mark_read))
}

async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = state
        .notification_service
        .list_for_user(&user.0, user_id)
        .await?;
    Ok(Json(
        notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
    ))
}

async fn unread_count(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state
        .notification_service
        .unread_count(&user.0, user_id)
        .await?;
    Ok(Json(CountResponse { count }))
}

/// PUT /api/notifications/{id}/read
async fn mark_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification = state.notification_service.mark_read(&user.0, id).await?;
    Ok(Json(notification.into()))
}
