//! Notification model
//!
//! Notifications are only ever produced as a side effect of another
//! operation (registration, submission, approval, messaging).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    AccountRequest,
    PostRequest,
    Message,
    Success,
    Info,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccountRequest => write!(f, "account_request"),
            Self::PostRequest => write!(f, "post_request"),
            Self::Message => write!(f, "message"),
            Self::Success => write!(f, "success"),
            Self::Info => write!(f, "info"),
        }
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "account_request" => Ok(Self::AccountRequest),
            "post_request" => Ok(Self::PostRequest),
            "message" => Ok(Self::Message),
            "success" => Ok(Self::Success),
            "info" => Ok(Self::Info),
            _ => Err(format!("Invalid notification type: {}", s)),
        }
    }
}

/// Notification entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    /// Recipient
    pub user_id: i64,
    pub message: String,
    pub notification_type: NotificationType,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a notification (always unread)
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub message: String,
    pub notification_type: NotificationType,
}
