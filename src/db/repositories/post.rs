//! Post repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::Arc;

use crate::db::DynDatabasePool;
use crate::models::{AuthorSummary, NewPost, Post, PostType, PostWithAuthor};

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, post: &NewPost) -> Result<Post>;

    /// Get a post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get a post with its author expanded
    async fn get_with_author(&self, id: i64) -> Result<Option<PostWithAuthor>>;

    /// List posts by approval state, newest first, optionally filtered by type
    async fn list(&self, approved: bool, post_type: Option<PostType>) -> Result<Vec<PostWithAuthor>>;

    /// Mark a post approved. Returns false if the post doesn't exist.
    async fn approve(&self, id: i64) -> Result<bool>;

    /// Replace the text content. Returns false if the post doesn't exist.
    async fn update_content(&self, id: i64, content: &str) -> Result<bool>;

    /// Delete a post and all of its comments atomically.
    ///
    /// Returns the number of comments removed, or `None` if the post doesn't exist.
    async fn delete_cascade(&self, id: i64) -> Result<Option<u64>>;
}

/// SQLx-based post repository
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_WITH_AUTHOR_SELECT: &str = r#"
    SELECT p.id, p.author_id, p.post_type, p.content, p.image, p.is_approved, p.created_at,
           u.username AS author_username, u.full_name AS author_full_name
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &NewPost) -> Result<Post> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO posts (author_id, post_type, content, image, is_approved, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post.author_id)
        .bind(post.post_type.to_string())
        .bind(&post.content)
        .bind(&post.image)
        .bind(post.is_approved)
        .bind(now)
        .execute(self.pool.pool())
        .await
        .context("Failed to create post")?;

        Ok(Post {
            id: result.last_insert_rowid(),
            author_id: post.author_id,
            post_type: post.post_type,
            content: post.content.clone(),
            image: post.image.clone(),
            is_approved: post.is_approved,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(
            "SELECT id, author_id, post_type, content, image, is_approved, created_at FROM posts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .context("Failed to get post by ID")?;

        row.as_ref().map(row_to_post).transpose()
    }

    async fn get_with_author(&self, id: i64) -> Result<Option<PostWithAuthor>> {
        let sql = format!("{} WHERE p.id = ?", POST_WITH_AUTHOR_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .context("Failed to get post with author")?;

        row.as_ref().map(row_to_post_with_author).transpose()
    }

    async fn list(&self, approved: bool, post_type: Option<PostType>) -> Result<Vec<PostWithAuthor>> {
        let rows = match post_type {
            Some(post_type) => {
                let sql = format!(
                    "{} WHERE p.is_approved = ? AND p.post_type = ? ORDER BY p.created_at DESC, p.id DESC",
                    POST_WITH_AUTHOR_SELECT
                );
                sqlx::query(&sql)
                    .bind(approved)
                    .bind(post_type.to_string())
                    .fetch_all(self.pool.pool())
                    .await
            }
            None => {
                let sql = format!(
                    "{} WHERE p.is_approved = ? ORDER BY p.created_at DESC, p.id DESC",
                    POST_WITH_AUTHOR_SELECT
                );
                sqlx::query(&sql)
                    .bind(approved)
                    .fetch_all(self.pool.pool())
                    .await
            }
        }
        .context("Failed to list posts")?;

        rows.iter().map(row_to_post_with_author).collect()
    }

    async fn approve(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE posts SET is_approved = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .context("Failed to approve post")?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE posts SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(self.pool.pool())
            .await
            .context("Failed to update post")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_cascade(&self, id: i64) -> Result<Option<u64>> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .context("Failed to begin post deletion")?;

        let comments = sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete post comments")?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete post")?
            .rows_affected();

        if deleted == 0 {
            // Nothing to delete; dropping the transaction rolls back.
            return Ok(None);
        }

        tx.commit().await.context("Failed to commit post deletion")?;
        Ok(Some(comments))
    }
}

fn parse_post_type(row: &SqliteRow) -> Result<PostType> {
    let raw: String = row.get("post_type");
    raw.parse::<PostType>().map_err(|e| anyhow::anyhow!(e))
}

fn row_to_post(row: &SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        post_type: parse_post_type(row)?,
        content: row.get("content"),
        image: row.get("image"),
        is_approved: row.get("is_approved"),
        created_at: row.get("created_at"),
    })
}

fn row_to_post_with_author(row: &SqliteRow) -> Result<PostWithAuthor> {
    let post = row_to_post(row)?;
    let author = AuthorSummary {
        id: post.author_id,
        username: row.get("author_username"),
        full_name: row.get("author_full_name"),
    };
    Ok(PostWithAuthor { post, author })
}
