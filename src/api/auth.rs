//! Authentication API endpoints
//!
//! - POST /api/auth/login - check credentials, issue a session token
//! - POST /api/auth/signup - register an account pending approval
//! - GET /api/auth/me - the session's user

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, ApiJson, AppState, AuthenticatedUser};
use crate::api::responses::{LoginResponse, RegisterResponse, UserResponse};
use crate::services::{RegisterInput, ServiceError};

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    #[serde(alias = "password")]
    pub secret: String,
}

/// Request body for registration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    #[serde(alias = "password")]
    pub secret: String,
    pub full_name: String,
    pub location: String,
    pub contact_number: String,
    #[serde(default)]
    pub id_picture: Option<String>,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/signup", post(signup))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/me", get(current_user))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(&body.username, &body.secret)
        .await?;

    let session = state.sessions.issue(user.id).map_err(ServiceError::Store)?;
    Ok(Json(LoginResponse {
        user: user.into(),
        token: session.token,
        expires_at: session.expires_at,
    }))
}

/// POST /api/auth/signup
///
/// Does not log the new user in.
async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let registration = state
        .user_service
        .register(RegisterInput {
            username: body.username,
            secret: body.secret,
            full_name: body.full_name,
            location: body.location,
            contact_number: body.contact_number,
            id_picture: body.id_picture,
        })
        .await?;

    Ok(Json(RegisterResponse {
        message: registration.message,
        success: true,
    }))
}

/// GET /api/auth/me
async fn current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}
