//! Direct messages between users

use std::sync::Arc;

use crate::db::repositories::{MessageRepository, UserRepository};
use crate::models::{MessageWithParties, NewMessage, NotificationType, UserProfile};
use crate::services::error::{required, ServiceError, ServiceResult};
use crate::services::notification::NotificationService;

/// Message service
pub struct MessageService {
    message_repo: Arc<dyn MessageRepository>,
    user_repo: Arc<dyn UserRepository>,
    notifications: Arc<NotificationService>,
}

impl MessageService {
    pub fn new(
        message_repo: Arc<dyn MessageRepository>,
        user_repo: Arc<dyn UserRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            message_repo,
            user_repo,
            notifications,
        }
    }

    /// Messages a user sent or received, newest first (the user or the admin)
    pub async fn list_for_user(
        &self,
        actor: &UserProfile,
        user_id: i64,
    ) -> ServiceResult<Vec<MessageWithParties>> {
        if !actor.can_act_for(user_id) {
            return Err(ServiceError::forbidden("You can only view your own messages"));
        }
        Ok(self.message_repo.list_for_user(user_id).await?)
    }

    /// Send a message from `actor` and notify the recipient
    pub async fn send(
        &self,
        actor: &UserProfile,
        recipient_id: i64,
        content: &str,
    ) -> ServiceResult<MessageWithParties> {
        let content = required("Content", content)?;
        if recipient_id == actor.id {
            return Err(ServiceError::validation("You cannot message yourself"));
        }

        let recipient = self
            .user_repo
            .get_by_id(recipient_id)
            .await?
            .ok_or(ServiceError::NotFound("Recipient"))?;

        let message = self
            .message_repo
            .create(&NewMessage {
                sender_id: actor.id,
                recipient_id: recipient.id,
                content,
            })
            .await?;

        self.notifications
            .notify(
                recipient.id,
                format!("New message from {}", actor.full_name),
                NotificationType::Message,
            )
            .await?;

        tracing::debug!("Message {} sent from '{}' to '{}'", message.id, actor.username, recipient.username);

        self.message_repo
            .get_with_parties(message.id)
            .await?
            .ok_or(ServiceError::NotFound("Message"))
    }
}
