//! Notification fan-out
//!
//! Notifications are appended as a side effect of registration, post
//! submission, approvals and messaging. Users never create them directly.

use std::sync::Arc;

use crate::db::repositories::{NotificationRepository, UserRepository};
use crate::models::{NewNotification, Notification, NotificationType, UserProfile};
use crate::services::error::{ServiceError, ServiceResult};

/// Notification service
pub struct NotificationService {
    notification_repo: Arc<dyn NotificationRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl NotificationService {
    pub fn new(
        notification_repo: Arc<dyn NotificationRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            notification_repo,
            user_repo,
        }
    }

    /// Append one unread notification for `user_id`
    pub async fn notify(
        &self,
        user_id: i64,
        message: impl Into<String>,
        notification_type: NotificationType,
    ) -> ServiceResult<Notification> {
        let notification = self
            .notification_repo
            .create(&NewNotification {
                user_id,
                message: message.into(),
                notification_type,
            })
            .await?;

        tracing::debug!(
            "Notification {} ({}) sent to user {}",
            notification.id,
            notification.notification_type,
            user_id
        );
        Ok(notification)
    }

    /// Notify the admin account. Skipped with a warning if none exists.
    pub async fn notify_admin(
        &self,
        message: impl Into<String>,
        notification_type: NotificationType,
    ) -> ServiceResult<Option<Notification>> {
        match self.user_repo.find_admin().await? {
            Some(admin) => Ok(Some(self.notify(admin.id, message, notification_type).await?)),
            None => {
                tracing::warn!("No admin account to notify");
                Ok(None)
            }
        }
    }

    /// Notifications for a user, newest first (the user or the admin)
    pub async fn list_for_user(
        &self,
        actor: &UserProfile,
        user_id: i64,
    ) -> ServiceResult<Vec<Notification>> {
        if !actor.can_act_for(user_id) {
            return Err(ServiceError::forbidden(
                "You can only view your own notifications",
            ));
        }
        Ok(self.notification_repo.list_for_user(user_id).await?)
    }

    /// Number of unread notifications for a user (the user or the admin)
    pub async fn unread_count(&self, actor: &UserProfile, user_id: i64) -> ServiceResult<i64> {
        if !actor.can_act_for(user_id) {
            return Err(ServiceError::forbidden(
                "You can only view your own notifications",
            ));
        }
        Ok(self.notification_repo.count_unread(user_id).await?)
    }

    /// Mark a notification read. Idempotent.
    pub async fn mark_read(&self, actor: &UserProfile, id: i64) -> ServiceResult<Notification> {
        let existing = self
            .notification_repo
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Notification"))?;

        if !actor.can_act_for(existing.user_id) {
            return Err(ServiceError::forbidden(
                "You can only update your own notifications",
            ));
        }

        // The record can vanish between the lookup and the update if its
        // owner is deleted concurrently.
        self.notification_repo
            .mark_read(id)
            .await?
            .ok_or(ServiceError::NotFound("Notification"))
    }
}
