//! Message repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::Arc;

use crate::db::DynDatabasePool;
use crate::models::{AuthorSummary, Message, MessageWithParties, NewMessage};

/// Message repository trait
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Create a new message
    async fn create(&self, message: &NewMessage) -> Result<Message>;

    /// Get a message with sender and recipient expanded
    async fn get_with_parties(&self, id: i64) -> Result<Option<MessageWithParties>>;

    /// Messages the user sent or received, newest first
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<MessageWithParties>>;
}

/// SQLx-based message repository
pub struct SqlxMessageRepository {
    pool: DynDatabasePool,
}

impl SqlxMessageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MessageRepository> {
        Arc::new(Self::new(pool))
    }
}

const MESSAGE_WITH_PARTIES_SELECT: &str = r#"
    SELECT m.id, m.sender_id, m.recipient_id, m.content, m.created_at,
           s.username AS sender_username, s.full_name AS sender_full_name,
           r.username AS recipient_username, r.full_name AS recipient_full_name
    FROM messages m
    JOIN users s ON s.id = m.sender_id
    JOIN users r ON r.id = m.recipient_id
"#;

#[async_trait]
impl MessageRepository for SqlxMessageRepository {
    async fn create(&self, message: &NewMessage) -> Result<Message> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO messages (sender_id, recipient_id, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(message.sender_id)
        .bind(message.recipient_id)
        .bind(&message.content)
        .bind(now)
        .execute(self.pool.pool())
        .await
        .context("Failed to create message")?;

        Ok(Message {
            id: result.last_insert_rowid(),
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            content: message.content.clone(),
            created_at: now,
        })
    }

    async fn get_with_parties(&self, id: i64) -> Result<Option<MessageWithParties>> {
        let sql = format!("{} WHERE m.id = ?", MESSAGE_WITH_PARTIES_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .context("Failed to get message")?;

        Ok(row.as_ref().map(row_to_message_with_parties))
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<MessageWithParties>> {
        let sql = format!(
            "{} WHERE m.sender_id = ? OR m.recipient_id = ? ORDER BY m.created_at DESC, m.id DESC",
            MESSAGE_WITH_PARTIES_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(user_id)
            .fetch_all(self.pool.pool())
            .await
            .context("Failed to list messages")?;

        Ok(rows.iter().map(row_to_message_with_parties).collect())
    }
}

fn row_to_message_with_parties(row: &SqliteRow) -> MessageWithParties {
    let message = Message {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        recipient_id: row.get("recipient_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    };
    let sender = AuthorSummary {
        id: message.sender_id,
        username: row.get("sender_username"),
        full_name: row.get("sender_full_name"),
    };
    let recipient = AuthorSummary {
        id: message.recipient_id,
        username: row.get("recipient_username"),
        full_name: row.get("recipient_full_name"),
    };
    MessageWithParties {
        message,
        sender,
        recipient,
    }
}
