//! Post service
//!
//! Post submission and moderation. Admin posts are published immediately;
//! everyone else's wait in the pending queue until approved.

use std::sync::Arc;

use crate::db::repositories::PostRepository;
use crate::models::{AuthorSummary, NewPost, NotificationType, PostType, PostWithAuthor, UserProfile};
use crate::services::error::{required, ServiceError, ServiceResult};
use crate::services::image::ImagePolicy;
use crate::services::notification::NotificationService;
use crate::services::user::require_admin;

/// Input for creating a post
#[derive(Debug, Clone)]
pub struct CreatePostInput {
    /// "lost" or "found"
    pub post_type: String,
    pub content: String,
    /// Image as a data URL
    pub image: Option<String>,
}

/// Outcome of a post submission
#[derive(Debug, Clone)]
pub struct PostSubmission {
    pub post: PostWithAuthor,
    pub message: String,
}

/// Post service
pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    notifications: Arc<NotificationService>,
    images: ImagePolicy,
}

impl PostService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        notifications: Arc<NotificationService>,
        images: ImagePolicy,
    ) -> Self {
        Self {
            post_repo,
            notifications,
            images,
        }
    }

    /// Submit a post authored by `actor`.
    pub async fn create(
        &self,
        actor: &UserProfile,
        input: CreatePostInput,
    ) -> ServiceResult<PostSubmission> {
        let post_type: PostType = input
            .post_type
            .trim()
            .parse()
            .map_err(|_| ServiceError::validation("Type must be 'lost' or 'found'"))?;
        let content = required("Content", &input.content)?;
        let image = self.images.check("image", input.image)?;

        let auto_approve = actor.is_admin();
        let post = self
            .post_repo
            .create(&NewPost {
                author_id: actor.id,
                post_type,
                content,
                image,
                is_approved: auto_approve,
            })
            .await?;

        let message = if auto_approve {
            "Post created successfully"
        } else {
            self.notifications
                .notify_admin(
                    format!("New post request from {}", actor.full_name),
                    NotificationType::PostRequest,
                )
                .await?;
            "Post submitted! Waiting for admin approval."
        };

        tracing::info!(
            "Post {} ({}) submitted by '{}', approved: {}",
            post.id,
            post.post_type,
            actor.username,
            post.is_approved
        );

        Ok(PostSubmission {
            post: PostWithAuthor {
                post,
                author: AuthorSummary {
                    id: actor.id,
                    username: actor.username.clone(),
                    full_name: actor.full_name.clone(),
                },
            },
            message: message.to_string(),
        })
    }

    /// Published posts, newest first
    pub async fn list_approved(&self, post_type: Option<PostType>) -> ServiceResult<Vec<PostWithAuthor>> {
        Ok(self.post_repo.list(true, post_type).await?)
    }

    /// Posts awaiting moderation, newest first (admin only)
    pub async fn list_pending(
        &self,
        actor: &UserProfile,
        post_type: Option<PostType>,
    ) -> ServiceResult<Vec<PostWithAuthor>> {
        require_admin(actor)?;
        Ok(self.post_repo.list(false, post_type).await?)
    }

    /// A single post. Pending posts are only visible to their author and the admin.
    pub async fn get(&self, actor: &UserProfile, id: i64) -> ServiceResult<PostWithAuthor> {
        let post = self
            .post_repo
            .get_with_author(id)
            .await?
            .ok_or(ServiceError::NotFound("Post"))?;

        if !post.post.is_approved && !actor.can_act_for(post.post.author_id) {
            return Err(ServiceError::NotFound("Post"));
        }
        Ok(post)
    }

    /// Publish a post and tell its author.
    pub async fn approve(&self, actor: &UserProfile, id: i64) -> ServiceResult<String> {
        require_admin(actor)?;
        let post = self
            .post_repo
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Post"))?;

        if !self.post_repo.approve(id).await? {
            return Err(ServiceError::NotFound("Post"));
        }

        self.notifications
            .notify(post.author_id, "Your post has been approved!", NotificationType::Success)
            .await?;

        tracing::info!("Post {} approved by '{}'", id, actor.username);
        Ok("Post approved successfully".to_string())
    }

    /// Reject a pending post, removing it with its comments.
    pub async fn decline(&self, actor: &UserProfile, id: i64) -> ServiceResult<String> {
        require_admin(actor)?;
        let post = self
            .post_repo
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Post"))?;

        if post.is_approved {
            return Err(ServiceError::validation("Only pending posts can be declined"));
        }

        self.post_repo
            .delete_cascade(id)
            .await?
            .ok_or(ServiceError::NotFound("Post"))?;

        tracing::info!("Post {} declined by '{}'", id, actor.username);
        Ok("Post declined and deleted".to_string())
    }

    /// Replace a post's text. Type and image are left alone.
    pub async fn update_content(
        &self,
        actor: &UserProfile,
        id: i64,
        content: &str,
    ) -> ServiceResult<PostWithAuthor> {
        require_admin(actor)?;
        let content = required("Content", content)?;

        if !self.post_repo.update_content(id, &content).await? {
            return Err(ServiceError::NotFound("Post"));
        }

        self.post_repo
            .get_with_author(id)
            .await?
            .ok_or(ServiceError::NotFound("Post"))
    }

    /// Remove a post with its comments, regardless of approval state.
    pub async fn delete(&self, actor: &UserProfile, id: i64) -> ServiceResult<String> {
        require_admin(actor)?;

        let comments = self
            .post_repo
            .delete_cascade(id)
            .await?
            .ok_or(ServiceError::NotFound("Post"))?;

        tracing::info!(
            "Post {} deleted by '{}' with {} comments",
            id,
            actor.username,
            comments
        );
        Ok("Post deleted successfully".to_string())
    }
}
