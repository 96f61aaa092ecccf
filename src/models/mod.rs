//! Data models
//!
//! This module contains all data structures used throughout the board:
//! - Store entities (User, Post, Comment, Message, Notification)
//! - Expanded views with author references
//! - Insert inputs consumed by the repositories

mod comment;
mod message;
mod notification;
mod post;
mod user;

pub use comment::{Comment, CommentWithAuthor, NewComment};
pub use message::{Message, MessageWithParties, NewMessage};
pub use notification::{NewNotification, Notification, NotificationType};
pub use post::{NewPost, Post, PostType, PostWithAuthor};
pub use user::{AuthorSummary, CascadeReport, NewUser, User, UserFilter, UserProfile, UserRole};
