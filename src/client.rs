//! Typed HTTP client for the board API
//!
//! Used by presentation layers (and the end-to-end tests) to talk to a
//! running server. Keeps the session token client-side and separates
//! transport failures from errors reported by the API.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::api::health::HealthResponse;
use crate::api::middleware::ApiError;
use crate::api::responses::{
    AccountDeletedResponse, CommentResponse, CountResponse, LoginResponse, MessageBody,
    MessageResponse, NotificationResponse, PostCreatedResponse, PostResponse, RegisterResponse,
    UserResponse,
};
use crate::models::{PostType, UserFilter};

/// Errors that can occur when talking to the API
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached
    #[error("Cannot reach the server: {0}")]
    Network(String),
    /// The server answered with an error body
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }

    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Registration fields
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub secret: String,
    pub full_name: String,
    pub location: String,
    pub contact_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_picture: Option<String>,
}

/// Board API client
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for a server such as `http://localhost:3000`
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Session token from the last successful login
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/api{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !status.is_success() {
            let (code, message) = match serde_json::from_slice::<ApiError>(&body) {
                Ok(err) => (Some(err.code), err.error),
                Err(_) => (None, String::from_utf8_lossy(&body).into_owned()),
            };
            return Err(ClientError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn put<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.request(Method::PUT, path)).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.request(Method::DELETE, path)).await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.request(method, path).json(body)).await
    }

    // Auth

    /// Log in and keep the returned session token
    pub async fn login(&mut self, username: &str, secret: &str) -> Result<UserResponse, ClientError> {
        let response: LoginResponse = self
            .send_json(
                Method::POST,
                "/auth/login",
                &json!({ "username": username, "secret": secret }),
            )
            .await?;
        self.token = Some(response.token);
        Ok(response.user)
    }

    pub fn logout(&mut self) {
        self.token = None;
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<RegisterResponse, ClientError> {
        self.send_json(Method::POST, "/auth/signup", request).await
    }

    pub async fn me(&self) -> Result<UserResponse, ClientError> {
        self.get("/auth/me").await
    }

    // Users

    pub async fn list_users(&self, filter: UserFilter) -> Result<Vec<UserResponse>, ClientError> {
        let path = match filter {
            UserFilter::All => "/users",
            UserFilter::Approved => "/users/approved",
            UserFilter::Pending => "/users/pending",
        };
        self.get(path).await
    }

    pub async fn approve_user(&self, id: i64) -> Result<MessageBody, ClientError> {
        self.put(&format!("/users/{}/approve", id)).await
    }

    pub async fn decline_user(&self, id: i64) -> Result<MessageBody, ClientError> {
        self.delete(&format!("/users/{}/decline", id)).await
    }

    /// Delete an account. Deleting your own account also drops the local token.
    pub async fn delete_user(&mut self, id: i64) -> Result<AccountDeletedResponse, ClientError> {
        let response: AccountDeletedResponse = self.delete(&format!("/users/{}", id)).await?;
        if response.session_terminated {
            self.token = None;
        }
        Ok(response)
    }

    // Posts

    fn post_list_path(base: &str, post_type: Option<PostType>) -> String {
        match post_type {
            Some(PostType::Lost) => format!("{}?type=lost", base),
            Some(PostType::Found) => format!("{}?type=found", base),
            None => base.to_string(),
        }
    }

    pub async fn approved_posts(
        &self,
        post_type: Option<PostType>,
    ) -> Result<Vec<PostResponse>, ClientError> {
        self.get(&Self::post_list_path("/posts/approved", post_type))
            .await
    }

    pub async fn pending_posts(
        &self,
        post_type: Option<PostType>,
    ) -> Result<Vec<PostResponse>, ClientError> {
        self.get(&Self::post_list_path("/posts/pending", post_type))
            .await
    }

    pub async fn create_post(
        &self,
        post_type: PostType,
        content: &str,
        image: Option<&str>,
    ) -> Result<PostCreatedResponse, ClientError> {
        self.send_json(
            Method::POST,
            "/posts",
            &json!({ "type": post_type, "content": content, "image": image }),
        )
        .await
    }

    pub async fn get_post(&self, id: i64) -> Result<PostResponse, ClientError> {
        self.get(&format!("/posts/{}", id)).await
    }

    pub async fn update_post(&self, id: i64, content: &str) -> Result<PostResponse, ClientError> {
        self.send_json(
            Method::PUT,
            &format!("/posts/{}", id),
            &json!({ "content": content }),
        )
        .await
    }

    pub async fn delete_post(&self, id: i64) -> Result<MessageBody, ClientError> {
        self.delete(&format!("/posts/{}", id)).await
    }

    pub async fn approve_post(&self, id: i64) -> Result<MessageBody, ClientError> {
        self.put(&format!("/posts/{}/approve", id)).await
    }

    pub async fn decline_post(&self, id: i64) -> Result<MessageBody, ClientError> {
        self.delete(&format!("/posts/{}/decline", id)).await
    }

    // Comments

    pub async fn comments(&self, post_id: i64) -> Result<Vec<CommentResponse>, ClientError> {
        self.get(&format!("/comments/post/{}", post_id)).await
    }

    pub async fn add_comment(
        &self,
        post_id: i64,
        content: &str,
    ) -> Result<CommentResponse, ClientError> {
        self.send_json(
            Method::POST,
            "/comments",
            &json!({ "postId": post_id, "content": content }),
        )
        .await
    }

    pub async fn update_comment(
        &self,
        id: i64,
        content: &str,
    ) -> Result<CommentResponse, ClientError> {
        self.send_json(
            Method::PUT,
            &format!("/comments/{}", id),
            &json!({ "content": content }),
        )
        .await
    }

    // Messages

    pub async fn messages(&self, user_id: i64) -> Result<Vec<MessageResponse>, ClientError> {
        self.get(&format!("/messages/user/{}", user_id)).await
    }

    pub async fn send_message(
        &self,
        recipient_id: i64,
        content: &str,
    ) -> Result<MessageResponse, ClientError> {
        self.send_json(
            Method::POST,
            "/messages",
            &json!({ "recipientId": recipient_id, "content": content }),
        )
        .await
    }

    // Notifications

    pub async fn notifications(
        &self,
        user_id: i64,
    ) -> Result<Vec<NotificationResponse>, ClientError> {
        self.get(&format!("/notifications/user/{}", user_id)).await
    }

    pub async fn unread_count(&self, user_id: i64) -> Result<i64, ClientError> {
        let response: CountResponse = self
            .get(&format!("/notifications/user/{}/unread-count", user_id))
            .await?;
        Ok(response.count)
    }

    pub async fn mark_read(&self, id: i64) -> Result<NotificationResponse, ClientError> {
        self.put(&format!("/notifications/{}/read", id)).await
    }

    /// Store health. A degraded store is reported in the body, not as an error.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self
            .request(Method::GET, "/health")
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}
