//! In-memory entity store
//!
//! All tables live behind one `tokio::sync::RwLock`, so every mutation,
//! cascades included, runs under a single write guard.
//!
//! With a snapshot path configured the tables are mirrored to a JSON file
//! after each mutation. The mutation is applied to a staged copy first and
//! only swapped in once the file has been written, so a failed write leaves
//! both the file and the live tables untouched.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::config::StoreDriver;
use crate::db::repositories::{
    CommentRepository, MessageRepository, NotificationRepository, PostRepository, UserRepository,
    UsernameTaken,
};
use crate::db::StoreBackend;
use crate::models::{
    CascadeReport, Comment, CommentWithAuthor, Message, MessageWithParties, NewComment,
    NewMessage, NewNotification, NewPost, NewUser, Notification, Post, PostType, PostWithAuthor,
    User, UserFilter, UserRole,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    messages: BTreeMap<i64, Message>,
    notifications: BTreeMap<i64, Notification>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_user(&self, id: i64) -> Result<&User> {
        self.users
            .get(&id)
            .ok_or_else(|| anyhow!("User {} does not exist", id))
    }

    fn post_with_author(&self, post: &Post) -> Option<PostWithAuthor> {
        let author = self.users.get(&post.author_id)?.summary();
        Some(PostWithAuthor {
            post: post.clone(),
            author,
        })
    }

    fn comment_with_author(&self, comment: &Comment) -> Option<CommentWithAuthor> {
        let author = self.users.get(&comment.author_id)?.summary();
        Some(CommentWithAuthor {
            comment: comment.clone(),
            author,
        })
    }

    fn message_with_parties(&self, message: &Message) -> Option<MessageWithParties> {
        let sender = self.users.get(&message.sender_id)?.summary();
        let recipient = self.users.get(&message.recipient_id)?.summary();
        Some(MessageWithParties {
            message: message.clone(),
            sender,
            recipient,
        })
    }

    fn delete_post_cascade(&mut self, id: i64) -> Option<u64> {
        self.posts.remove(&id)?;
        let before = self.comments.len();
        self.comments.retain(|_, c| c.post_id != id);
        Some((before - self.comments.len()) as u64)
    }
}

/// Entity store holding every table in process memory
pub struct MemoryStore {
    tables: RwLock<Tables>,
    snapshot_path: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store that is never written to disk
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            snapshot_path: None,
        }
    }

    /// Open a store, loading the snapshot file when it exists.
    pub async fn open(snapshot_path: Option<PathBuf>) -> Result<Self> {
        let tables = match &snapshot_path {
            Some(path) if path.exists() => {
                let data = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read snapshot: {:?}", path))?;
                serde_json::from_slice(&data)
                    .with_context(|| format!("Failed to parse snapshot: {:?}", path))?
            }
            _ => Tables::default(),
        };

        Ok(Self {
            tables: RwLock::new(tables),
            snapshot_path,
        })
    }

    async fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let tables = self.tables.read().await;
        f(&tables)
    }

    /// Apply a mutation under the write guard and persist it.
    ///
    /// Closures must validate before touching the tables when no snapshot
    /// is configured, since that path mutates in place.
    async fn mutate<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut tables = self.tables.write().await;

        match &self.snapshot_path {
            None => f(&mut tables),
            Some(path) => {
                let mut staged = tables.clone();
                let value = f(&mut staged)?;
                write_snapshot(path, &staged).await?;
                *tables = staged;
                Ok(value)
            }
        }
    }
}

async fn write_snapshot(path: &Path, tables: &Tables) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create snapshot directory: {:?}", parent))?;
        }
    }

    let data = serde_json::to_vec(tables).context("Failed to serialize snapshot")?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, data)
        .await
        .with_context(|| format!("Failed to write snapshot: {:?}", tmp))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace snapshot: {:?}", path))?;

    tracing::debug!("Snapshot written to {:?}", path);
    Ok(())
}

/// Newest first by `(created_at, id)`
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn ping(&self) -> Result<()> {
        let _guard = self.tables.read().await;
        Ok(())
    }

    fn driver(&self) -> StoreDriver {
        StoreDriver::Memory
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_with_notice(
        &self,
        user: &NewUser,
        notice: Option<&NewNotification>,
    ) -> Result<User> {
        self.mutate(|t| {
            if t.users.values().any(|u| u.username == user.username) {
                return Err(UsernameTaken(user.username.clone()).into());
            }
            if let Some(notice) = notice {
                t.require_user(notice.user_id)?;
            }
            let record = User {
                id: t.allocate_id(),
                username: user.username.clone(),
                secret: user.secret.clone(),
                role: user.role,
                full_name: user.full_name.clone(),
                location: user.location.clone(),
                contact_number: user.contact_number.clone(),
                id_picture: user.id_picture.clone(),
                is_approved: user.is_approved,
                created_at: Utc::now(),
            };
            t.users.insert(record.id, record.clone());
            if let Some(notice) = notice {
                let id = t.allocate_id();
                t.notifications.insert(
                    id,
                    Notification {
                        id,
                        user_id: notice.user_id,
                        message: notice.message.clone(),
                        notification_type: notice.notification_type,
                        read: false,
                        created_at: record.created_at,
                    },
                );
            }
            Ok(record)
        })
        .await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.read(|t| t.users.get(&id).cloned()).await)
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .read(|t| t.users.values().find(|u| u.username == username).cloned())
            .await)
    }

    async fn find_admin(&self) -> Result<Option<User>> {
        Ok(self
            .read(|t| t.users.values().find(|u| u.role == UserRole::Admin).cloned())
            .await)
    }

    async fn list(&self, filter: UserFilter) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .read(|t| t.users.values().filter(|u| filter.matches(u)).cloned().collect())
            .await;
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users)
    }

    async fn set_approved(&self, id: i64, approved: bool) -> Result<bool> {
        self.mutate(|t| {
            Ok(match t.users.get_mut(&id) {
                Some(user) => {
                    user.is_approved = approved;
                    true
                }
                None => false,
            })
        })
        .await
    }

    async fn delete_cascade(&self, id: i64) -> Result<Option<CascadeReport>> {
        self.mutate(|t| {
            if t.users.remove(&id).is_none() {
                return Ok(None);
            }

            let owned_posts: Vec<i64> = t
                .posts
                .values()
                .filter(|p| p.author_id == id)
                .map(|p| p.id)
                .collect();

            let comments_before = t.comments.len();
            t.comments
                .retain(|_, c| c.author_id != id && !owned_posts.contains(&c.post_id));

            let posts_before = t.posts.len();
            t.posts.retain(|_, p| p.author_id != id);

            let messages_before = t.messages.len();
            t.messages.retain(|_, m| !m.involves(id));

            let notifications_before = t.notifications.len();
            t.notifications.retain(|_, n| n.user_id != id);

            Ok(Some(CascadeReport {
                posts: (posts_before - t.posts.len()) as u64,
                comments: (comments_before - t.comments.len()) as u64,
                messages: (messages_before - t.messages.len()) as u64,
                notifications: (notifications_before - t.notifications.len()) as u64,
            }))
        })
        .await
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create(&self, post: &NewPost) -> Result<Post> {
        self.mutate(|t| {
            t.require_user(post.author_id)?;
            let record = Post {
                id: t.allocate_id(),
                author_id: post.author_id,
                post_type: post.post_type,
                content: post.content.clone(),
                image: post.image.clone(),
                is_approved: post.is_approved,
                created_at: Utc::now(),
            };
            t.posts.insert(record.id, record.clone());
            Ok(record)
        })
        .await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        Ok(self.read(|t| t.posts.get(&id).cloned()).await)
    }

    async fn get_with_author(&self, id: i64) -> Result<Option<PostWithAuthor>> {
        Ok(self
            .read(|t| t.posts.get(&id).and_then(|p| t.post_with_author(p)))
            .await)
    }

    async fn list(&self, approved: bool, post_type: Option<PostType>) -> Result<Vec<PostWithAuthor>> {
        let mut posts: Vec<PostWithAuthor> = self
            .read(|t| {
                t.posts
                    .values()
                    .filter(|p| p.is_approved == approved)
                    .filter(|p| post_type.map_or(true, |ty| p.post_type == ty))
                    .filter_map(|p| t.post_with_author(p))
                    .collect()
            })
            .await;
        newest_first(&mut posts, |p| (p.post.created_at, p.post.id));
        Ok(posts)
    }

    async fn approve(&self, id: i64) -> Result<bool> {
        self.mutate(|t| {
            Ok(match t.posts.get_mut(&id) {
                Some(post) => {
                    post.is_approved = true;
                    true
                }
                None => false,
            })
        })
        .await
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<bool> {
        self.mutate(|t| {
            Ok(match t.posts.get_mut(&id) {
                Some(post) => {
                    post.content = content.to_string();
                    true
                }
                None => false,
            })
        })
        .await
    }

    async fn delete_cascade(&self, id: i64) -> Result<Option<u64>> {
        self.mutate(|t| Ok(t.delete_post_cascade(id))).await
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(&self, comment: &NewComment) -> Result<Comment> {
        self.mutate(|t| {
            if !t.posts.contains_key(&comment.post_id) {
                return Err(anyhow!("Post {} does not exist", comment.post_id));
            }
            t.require_user(comment.author_id)?;
            let record = Comment {
                id: t.allocate_id(),
                post_id: comment.post_id,
                author_id: comment.author_id,
                content: comment.content.clone(),
                created_at: Utc::now(),
            };
            t.comments.insert(record.id, record.clone());
            Ok(record)
        })
        .await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        Ok(self.read(|t| t.comments.get(&id).cloned()).await)
    }

    async fn get_with_author(&self, id: i64) -> Result<Option<CommentWithAuthor>> {
        Ok(self
            .read(|t| t.comments.get(&id).and_then(|c| t.comment_with_author(c)))
            .await)
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        let mut comments: Vec<CommentWithAuthor> = self
            .read(|t| {
                t.comments
                    .values()
                    .filter(|c| c.post_id == post_id)
                    .filter_map(|c| t.comment_with_author(c))
                    .collect()
            })
            .await;
        comments.sort_by_key(|c| (c.comment.created_at, c.comment.id));
        Ok(comments)
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<bool> {
        self.mutate(|t| {
            Ok(match t.comments.get_mut(&id) {
                Some(comment) => {
                    comment.content = content.to_string();
                    true
                }
                None => false,
            })
        })
        .await
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn create(&self, message: &NewMessage) -> Result<Message> {
        self.mutate(|t| {
            t.require_user(message.sender_id)?;
            t.require_user(message.recipient_id)?;
            let record = Message {
                id: t.allocate_id(),
                sender_id: message.sender_id,
                recipient_id: message.recipient_id,
                content: message.content.clone(),
                created_at: Utc::now(),
            };
            t.messages.insert(record.id, record.clone());
            Ok(record)
        })
        .await
    }

    async fn get_with_parties(&self, id: i64) -> Result<Option<MessageWithParties>> {
        Ok(self
            .read(|t| t.messages.get(&id).and_then(|m| t.message_with_parties(m)))
            .await)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<MessageWithParties>> {
        let mut messages: Vec<MessageWithParties> = self
            .read(|t| {
                t.messages
                    .values()
                    .filter(|m| m.involves(user_id))
                    .filter_map(|m| t.message_with_parties(m))
                    .collect()
            })
            .await;
        newest_first(&mut messages, |m| (m.message.created_at, m.message.id));
        Ok(messages)
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create(&self, notification: &NewNotification) -> Result<Notification> {
        self.mutate(|t| {
            t.require_user(notification.user_id)?;
            let record = Notification {
                id: t.allocate_id(),
                user_id: notification.user_id,
                message: notification.message.clone(),
                notification_type: notification.notification_type,
                read: false,
                created_at: Utc::now(),
            };
            t.notifications.insert(record.id, record.clone());
            Ok(record)
        })
        .await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Notification>> {
        Ok(self.read(|t| t.notifications.get(&id).cloned()).await)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .read(|t| {
                t.notifications
                    .values()
                    .filter(|n| n.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .await;
        newest_first(&mut notifications, |n| (n.created_at, n.id));
        Ok(notifications)
    }

    async fn mark_read(&self, id: i64) -> Result<Option<Notification>> {
        self.mutate(|t| {
            Ok(t.notifications.get_mut(&id).map(|n| {
                n.read = true;
                n.clone()
            }))
        })
        .await
    }

    async fn count_unread(&self, user_id: i64) -> Result<i64> {
        Ok(self
            .read(|t| {
                t.notifications
                    .values()
                    .filter(|n| n.user_id == user_id && !n.read)
                    .count() as i64
            })
            .await)
    }
}
