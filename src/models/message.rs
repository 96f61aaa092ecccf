//! Direct message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AuthorSummary;

/// Message entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Messages belong to both ends of the conversation
    pub fn involves(&self, user_id: i64) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }
}

/// Message with sender and recipient expanded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageWithParties {
    pub message: Message,
    pub sender: AuthorSummary,
    pub recipient: AuthorSummary,
}

/// Input for inserting a message
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: i64,
    pub recipient_id: i64,
    pub content: String,
}
