//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AuthorSummary;

/// Comment entity. Lives and dies with its post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Comment with its author expanded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    pub comment: Comment,
    pub author: AuthorSummary,
}

/// Input for inserting a comment
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub content: String,
}
