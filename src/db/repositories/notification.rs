//! Notification repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::Arc;

use crate::db::DynDatabasePool;
use crate::models::{NewNotification, Notification, NotificationType};

/// Notification repository trait
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Append an unread notification
    async fn create(&self, notification: &NewNotification) -> Result<Notification>;

    /// Get a notification by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Notification>>;

    /// Notifications addressed to a user, newest first
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Notification>>;

    /// Set the read flag. Returns the updated record, or `None` if unknown.
    async fn mark_read(&self, id: i64) -> Result<Option<Notification>>;

    /// Number of unread notifications addressed to a user
    async fn count_unread(&self, user_id: i64) -> Result<i64>;
}

/// SQLx-based notification repository
pub struct SqlxNotificationRepository {
    pool: DynDatabasePool,
}

impl SqlxNotificationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NotificationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NotificationRepository for SqlxNotificationRepository {
    async fn create(&self, notification: &NewNotification) -> Result<Notification> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, message, notification_type, is_read, created_at)
            VALUES (?, ?, ?, 0, ?)
            "#,
        )
        .bind(notification.user_id)
        .bind(&notification.message)
        .bind(notification.notification_type.to_string())
        .bind(now)
        .execute(self.pool.pool())
        .await
        .context("Failed to create notification")?;

        Ok(Notification {
            id: result.last_insert_rowid(),
            user_id: notification.user_id,
            message: notification.message.clone(),
            notification_type: notification.notification_type,
            read: false,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Notification>> {
        let row = sqlx::query(
            "SELECT id, user_id, message, notification_type, is_read, created_at FROM notifications WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .context("Failed to get notification")?;

        row.as_ref().map(row_to_notification).transpose()
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, message, notification_type, is_read, created_at
            FROM notifications
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.pool())
        .await
        .context("Failed to list notifications")?;

        rows.iter().map(row_to_notification).collect()
    }

    async fn mark_read(&self, id: i64) -> Result<Option<Notification>> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .context("Failed to mark notification read")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    async fn count_unread(&self, user_id: i64) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(self.pool.pool())
        .await
        .context("Failed to count unread notifications")?;

        Ok(row.get("count"))
    }
}

fn row_to_notification(row: &SqliteRow) -> Result<Notification> {
    let raw_type: String = row.get("notification_type");
    let notification_type = raw_type
        .parse::<NotificationType>()
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        message: row.get("message"),
        notification_type,
        read: row.get("is_read"),
        created_at: row.get("created_at"),
    })
}
