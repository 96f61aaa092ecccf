//! API response types
//!
//! Wire shapes shared by the handlers and the HTTP client. Field names are
//! camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    AuthorSummary, CommentWithAuthor, MessageWithParties, Notification, NotificationType,
    PostType, PostWithAuthor, UserProfile, UserRole,
};
use crate::services::extract_mentions;

/// User without its secret
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub full_name: String,
    pub location: String,
    pub contact_number: String,
    pub id_picture: Option<String>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserProfile> for UserResponse {
    fn from(user: UserProfile) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            full_name: user.full_name,
            location: user.location,
            contact_number: user.contact_number,
            id_picture: user.id_picture,
            is_approved: user.is_approved,
            created_at: user.created_at,
        }
    }
}

/// Expanded author / sender / recipient reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorResponse {
    pub id: i64,
    pub username: String,
    pub full_name: String,
}

impl From<AuthorSummary> for AuthorResponse {
    fn from(author: AuthorSummary) -> Self {
        Self {
            id: author.id,
            username: author.username,
            full_name: author.full_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: i64,
    pub author: AuthorResponse,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub content: String,
    pub image: Option<String>,
    pub is_approved: bool,
    /// `@username` tokens found in the content
    pub mentions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PostWithAuthor> for PostResponse {
    fn from(p: PostWithAuthor) -> Self {
        Self {
            id: p.post.id,
            author: p.author.into(),
            post_type: p.post.post_type,
            mentions: extract_mentions(&p.post.content),
            content: p.post.content,
            image: p.post.image,
            is_approved: p.post.is_approved,
            created_at: p.post.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub author: AuthorResponse,
    pub content: String,
    pub mentions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CommentWithAuthor> for CommentResponse {
    fn from(c: CommentWithAuthor) -> Self {
        Self {
            id: c.comment.id,
            post_id: c.comment.post_id,
            author: c.author.into(),
            mentions: extract_mentions(&c.comment.content),
            content: c.comment.content,
            created_at: c.comment.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: i64,
    pub sender: AuthorResponse,
    pub recipient: AuthorResponse,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<MessageWithParties> for MessageResponse {
    fn from(m: MessageWithParties) -> Self {
        Self {
            id: m.message.id,
            sender: m.sender.into(),
            recipient: m.recipient.into(),
            content: m.message.content,
            created_at: m.message.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            message: n.message,
            notification_type: n.notification_type,
            read: n.read,
            created_at: n.created_at,
        }
    }
}

/// Successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Successful registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub success: bool,
}

/// Plain confirmation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Post submission result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCreatedResponse {
    pub post: PostResponse,
    pub message: String,
}

/// Account deletion result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDeletedResponse {
    pub message: String,
    pub session_terminated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: i64,
}
