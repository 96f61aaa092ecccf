//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::Arc;

use crate::db::DynDatabasePool;
use crate::models::{AuthorSummary, Comment, CommentWithAuthor, NewComment};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, comment: &NewComment) -> Result<Comment>;

    /// Get a comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Get a comment with its author expanded
    async fn get_with_author(&self, id: i64) -> Result<Option<CommentWithAuthor>>;

    /// Comments for a post in reading order (oldest first)
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;

    /// Replace the text content. Returns false if the comment doesn't exist.
    async fn update_content(&self, id: i64, content: &str) -> Result<bool>;
}

/// SQLx-based comment repository
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const COMMENT_WITH_AUTHOR_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.author_id, c.content, c.created_at,
           u.username AS author_username, u.full_name AS author_full_name
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &NewComment) -> Result<Comment> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO comments (post_id, author_id, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(now)
        .execute(self.pool.pool())
        .await
        .context("Failed to create comment")?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            content: comment.content.clone(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let row = sqlx::query("SELECT id, post_id, author_id, content, created_at FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .context("Failed to get comment by ID")?;

        Ok(row.as_ref().map(row_to_comment))
    }

    async fn get_with_author(&self, id: i64) -> Result<Option<CommentWithAuthor>> {
        let sql = format!("{} WHERE c.id = ?", COMMENT_WITH_AUTHOR_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .context("Failed to get comment with author")?;

        Ok(row.as_ref().map(row_to_comment_with_author))
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        let sql = format!(
            "{} WHERE c.post_id = ? ORDER BY c.created_at ASC, c.id ASC",
            COMMENT_WITH_AUTHOR_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(post_id)
            .fetch_all(self.pool.pool())
            .await
            .context("Failed to list comments")?;

        Ok(rows.iter().map(row_to_comment_with_author).collect())
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE comments SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(self.pool.pool())
            .await
            .context("Failed to update comment")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_comment(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

fn row_to_comment_with_author(row: &SqliteRow) -> CommentWithAuthor {
    let comment = row_to_comment(row);
    let author = AuthorSummary {
        id: comment.author_id,
        username: row.get("author_username"),
        full_name: row.get("author_full_name"),
    };
    CommentWithAuthor { comment, author }
}
