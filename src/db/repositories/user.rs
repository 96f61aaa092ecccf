//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite

use crate::db::DynDatabasePool;
use crate::models::{CascadeReport, NewNotification, NewUser, User, UserFilter, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use std::str::FromStr;
use std::sync::Arc;

/// Insert rejected because the username is already in use.
///
/// Returned inside the `anyhow::Error` of `create`, so callers can tell a
/// lost race on the unique username apart from a store failure.
#[derive(Debug, thiserror::Error)]
#[error("Username already taken: {0}")]
pub struct UsernameTaken(pub String);

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &NewUser) -> Result<User> {
        self.create_with_notice(user, None).await
    }

    /// Create a user and, when given, a notification in the same write.
    ///
    /// Fails with `UsernameTaken` if the username exists.
    async fn create_with_notice(
        &self,
        user: &NewUser,
        notice: Option<&NewNotification>,
    ) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get the admin-role account, if one exists
    async fn find_admin(&self) -> Result<Option<User>>;

    /// List users matching a filter, oldest first
    async fn list(&self, filter: UserFilter) -> Result<Vec<User>>;

    /// Set the approval flag. Returns false if the user doesn't exist.
    async fn set_approved(&self, id: i64, approved: bool) -> Result<bool>;

    /// Delete a user together with everything that references it:
    /// their posts, comments on those posts, their own comments, messages
    /// they sent or received and notifications addressed to them.
    ///
    /// All-or-nothing. Returns `None` if the user doesn't exist.
    async fn delete_cascade(&self, id: i64) -> Result<Option<CascadeReport>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const USER_COLUMNS: &str = "id, username, secret, role, full_name, location, contact_number, \
                            id_picture, is_approved, created_at";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create_with_notice(
        &self,
        user: &NewUser,
        notice: Option<&NewNotification>,
    ) -> Result<User> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .context("Failed to begin user creation")?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, secret, role, full_name, location, contact_number,
                               id_picture, is_approved, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.secret)
        .bind(user.role.to_string())
        .bind(&user.full_name)
        .bind(&user.location)
        .bind(&user.contact_number)
        .bind(&user.id_picture)
        .bind(user.is_approved)
        .bind(now)
        .execute(&mut *tx)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(UsernameTaken(user.username.clone()).into());
            }
            Err(e) => return Err(e).context("Failed to create user"),
        };

        if let Some(notice) = notice {
            sqlx::query(
                r#"
                INSERT INTO notifications (user_id, message, notification_type, is_read, created_at)
                VALUES (?, ?, ?, 0, ?)
                "#,
            )
            .bind(notice.user_id)
            .bind(&notice.message)
            .bind(notice.notification_type.to_string())
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to create notification")?;
        }

        tx.commit().await.context("Failed to commit user creation")?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: user.username.clone(),
            secret: user.secret.clone(),
            role: user.role,
            full_name: user.full_name.clone(),
            location: user.location.clone(),
            contact_number: user.contact_number.clone(),
            id_picture: user.id_picture.clone(),
            is_approved: user.is_approved,
            created_at: now,
        })
    }

    async fn create(&self, user: &NewUser) -> Result<User> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, secret, role, full_name, location, contact_number,
                               id_picture, is_approved, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.secret)
        .bind(user.role.to_string())
        .bind(&user.full_name)
        .bind(&user.location)
        .bind(&user.contact_number)
        .bind(&user.id_picture)
        .bind(user.is_approved)
        .bind(now)
        .execute(self.pool.pool())
        .await
        .context("Failed to create user")?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: user.username.clone(),
            secret: user.secret.clone(),
            role: user.role,
            full_name: user.full_name.clone(),
            location: user.location.clone(),
            contact_number: user.contact_number.clone(),
            id_picture: user.id_picture.clone(),
            is_approved: user.is_approved,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .context("Failed to get user by ID")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(self.pool.pool())
            .await
            .context("Failed to get user by username")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_admin(&self) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE role = ? ORDER BY id LIMIT 1",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(UserRole::Admin.to_string())
            .fetch_optional(self.pool.pool())
            .await
            .context("Failed to find admin")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn list(&self, filter: UserFilter) -> Result<Vec<User>> {
        let condition = match filter {
            UserFilter::All => "1 = 1",
            UserFilter::Approved => "is_approved = 1",
            UserFilter::Pending => "is_approved = 0 AND role = 'user'",
        };
        let sql = format!(
            "SELECT {} FROM users WHERE {} ORDER BY created_at ASC, id ASC",
            USER_COLUMNS, condition
        );

        let rows = sqlx::query(&sql)
            .fetch_all(self.pool.pool())
            .await
            .context("Failed to list users")?;

        rows.iter().map(row_to_user).collect()
    }

    async fn set_approved(&self, id: i64, approved: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_approved = ? WHERE id = ?")
            .bind(approved)
            .bind(id)
            .execute(self.pool.pool())
            .await
            .context("Failed to update user approval")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_cascade(&self, id: i64) -> Result<Option<CascadeReport>> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .context("Failed to begin account deletion")?;

        let exists = sqlx::query("SELECT id FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to look up user")?;
        if exists.is_none() {
            return Ok(None);
        }

        let comments = sqlx::query(
            r#"
            DELETE FROM comments
            WHERE author_id = ?
               OR post_id IN (SELECT id FROM posts WHERE author_id = ?)
            "#,
        )
        .bind(id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete user comments")?
        .rows_affected();

        let posts = sqlx::query("DELETE FROM posts WHERE author_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete user posts")?
            .rows_affected();

        let messages = sqlx::query("DELETE FROM messages WHERE sender_id = ? OR recipient_id = ?")
            .bind(id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete user messages")?
            .rows_affected();

        let notifications = sqlx::query("DELETE FROM notifications WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete user notifications")?
            .rows_affected();

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete user")?;

        tx.commit().await.context("Failed to commit account deletion")?;

        Ok(Some(CascadeReport {
            posts,
            comments,
            messages,
            notifications,
        }))
    }
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        secret: row.get("secret"),
        role,
        full_name: row.get("full_name"),
        location: row.get("location"),
        contact_number: row.get("contact_number"),
        id_picture: row.get("id_picture"),
        is_approved: row.get("is_approved"),
        created_at: row.get("created_at"),
    })
}
