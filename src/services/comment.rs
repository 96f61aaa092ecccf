//! Comment service

use std::sync::Arc;

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{CommentWithAuthor, NewComment, Post, UserProfile};
use crate::services::error::{required, ServiceError, ServiceResult};

/// Comment service
pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(comment_repo: Arc<dyn CommentRepository>, post_repo: Arc<dyn PostRepository>) -> Self {
        Self {
            comment_repo,
            post_repo,
        }
    }

    /// Comments on a post in reading order (oldest first)
    pub async fn list_for_post(
        &self,
        actor: &UserProfile,
        post_id: i64,
    ) -> ServiceResult<Vec<CommentWithAuthor>> {
        self.visible_post(actor, post_id).await?;
        Ok(self.comment_repo.list_by_post(post_id).await?)
    }

    /// Comment on a post as `actor`
    pub async fn create(
        &self,
        actor: &UserProfile,
        post_id: i64,
        content: &str,
    ) -> ServiceResult<CommentWithAuthor> {
        let content = required("Content", content)?;
        let post = self.visible_post(actor, post_id).await?;

        let comment = self
            .comment_repo
            .create(&NewComment {
                post_id: post.id,
                author_id: actor.id,
                content,
            })
            .await?;

        tracing::debug!("Comment {} added to post {} by '{}'", comment.id, post.id, actor.username);

        self.comment_repo
            .get_with_author(comment.id)
            .await?
            .ok_or(ServiceError::NotFound("Comment"))
    }

    /// Replace a comment's text (its author or the admin)
    pub async fn update_content(
        &self,
        actor: &UserProfile,
        id: i64,
        content: &str,
    ) -> ServiceResult<CommentWithAuthor> {
        let content = required("Content", content)?;
        let comment = self
            .comment_repo
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Comment"))?;

        if !actor.can_act_for(comment.author_id) {
            return Err(ServiceError::forbidden("You can only edit your own comments"));
        }

        if !self.comment_repo.update_content(id, &content).await? {
            return Err(ServiceError::NotFound("Comment"));
        }

        self.comment_repo
            .get_with_author(id)
            .await?
            .ok_or(ServiceError::NotFound("Comment"))
    }

    /// Pending posts only exist for their author and the admin.
    async fn visible_post(&self, actor: &UserProfile, post_id: i64) -> ServiceResult<Post> {
        match self.post_repo.get_by_id(post_id).await? {
            Some(post) if post.is_approved || actor.can_act_for(post.author_id) => Ok(post),
            _ => Err(ServiceError::NotFound("Post")),
        }
    }
}
