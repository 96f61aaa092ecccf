//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AuthorSummary;

/// Whether a post reports something lost or something found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Lost,
    Found,
}

impl std::fmt::Display for PostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lost => write!(f, "lost"),
            Self::Found => write!(f, "found"),
        }
    }
}

impl std::str::FromStr for PostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lost" => Ok(Self::Lost),
            "found" => Ok(Self::Found),
            _ => Err(format!("Invalid post type: {}", s)),
        }
    }
}

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub post_type: PostType,
    pub content: String,
    /// Inline data URL
    pub image: Option<String>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Post with its author expanded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: AuthorSummary,
}

/// Input for inserting a post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub post_type: PostType,
    pub content: String,
    pub image: Option<String>,
    pub is_approved: bool,
}
