//! API middleware
//!
//! Contains:
//! - `AppState` holding the shared services
//! - `ApiError`, the JSON error body every failure is rendered as
//! - Authentication (signed session token validation)
//! - Admin authorization
//! - Extractors that turn body and path rejections into `ApiError`

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, rejection::QueryRejection},
    extract::{FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{Config, StoreDriver};
use crate::db::{Store, StoreBackend};
use crate::models::UserProfile;
use crate::services::{
    CommentService, CredentialPolicy, ImagePolicy, MessageService, NotificationService,
    PostService, ServiceError, SessionSigner, UserService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub message_service: Arc<MessageService>,
    pub notification_service: Arc<NotificationService>,
    pub sessions: Arc<SessionSigner>,
    pub backend: Arc<dyn StoreBackend>,
    pub driver: StoreDriver,
}

impl AppState {
    /// Wire services over a store
    pub fn new(store: &Store, config: &Config) -> anyhow::Result<Self> {
        let images = ImagePolicy::new(config.upload.clone());
        let notification_service = Arc::new(NotificationService::new(
            store.notifications.clone(),
            store.users.clone(),
        ));

        let user_service = Arc::new(UserService::new(
            store.users.clone(),
            notification_service.clone(),
            CredentialPolicy::new(config.auth.hash_secrets),
            images.clone(),
        ));
        let post_service = Arc::new(PostService::new(
            store.posts.clone(),
            notification_service.clone(),
            images,
        ));
        let comment_service = Arc::new(CommentService::new(
            store.comments.clone(),
            store.posts.clone(),
        ));
        let message_service = Arc::new(MessageService::new(
            store.messages.clone(),
            store.users.clone(),
            notification_service.clone(),
        ));

        Ok(Self {
            user_service,
            post_service,
            comment_service,
            message_service,
            notification_service,
            sessions: Arc::new(SessionSigner::from_config(&config.auth)?),
            driver: store.backend.driver(),
            backend: store.backend.clone(),
        })
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserProfile);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors: `{ "error": <message>, "code": <code> }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "UNAUTHORIZED" | "INVALID_CREDENTIALS" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" | "PENDING_APPROVAL" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" | "DUPLICATE_USERNAME" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Validation(_) => Self::validation_error(message),
            ServiceError::DuplicateUsername(_) => Self::new("DUPLICATE_USERNAME", message),
            ServiceError::InvalidCredentials => Self::new("INVALID_CREDENTIALS", message),
            ServiceError::PendingApproval => Self::new("PENDING_APPROVAL", message),
            ServiceError::Forbidden(_) => Self::forbidden(message),
            ServiceError::NotFound(_) => Self::not_found(message),
            ServiceError::Store(e) => {
                tracing::error!("Store failure: {:#}", e);
                Self::internal_error(message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation_error(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation_error(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation_error(rejection.body_text())
    }
}

/// JSON body extractor rejecting with an `ApiError`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path extractor rejecting with an `ApiError`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query extractor rejecting with an `ApiError`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Extract the bearer token from the Authorization header
fn extract_session_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Authentication middleware
///
/// Resolves the token's user from the store on every request, so deleted
/// or unapproved accounts are rejected even with a valid signature.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user_id = state
        .sessions
        .verify(token)
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    let user = state
        .user_service
        .resolve_session(user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_admin() {
        return Err(ApiError::forbidden("Admin access required"));
    }

    Ok(next.run(request).await)
}
