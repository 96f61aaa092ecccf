//! User model
//!
//! This module defines the User entity and related types for the lost-and-found board.
//! A `User` carries its stored credential; everything that leaves the store
//! towards callers goes through `UserProfile`, which has no secret field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity as held by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Stored credential (Argon2id PHC string or verbatim secret)
    pub secret: String,
    /// User role
    pub role: UserRole,
    pub full_name: String,
    pub location: String,
    pub contact_number: String,
    /// Identity picture as an inline data URL
    pub id_picture: Option<String>,
    /// Approval flag gating authentication for non-admin users
    pub is_approved: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Check if the user is the administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins always pass; everyone else needs approval.
    pub fn can_authenticate(&self) -> bool {
        self.is_admin() || self.is_approved
    }

    /// Strip the secret
    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self.clone())
    }

    /// Short author reference used when expanding posts, comments and messages
    pub fn summary(&self) -> AuthorSummary {
        AuthorSummary {
            id: self.id,
            username: self.username.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// A user record with the secret removed.
///
/// This is also the session context passed into every service call that acts
/// on behalf of somebody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub full_name: String,
    pub location: String,
    pub contact_number: String,
    pub id_picture: Option<String>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Check if the user is the administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admin or the owner of `user_id`
    pub fn can_act_for(&self, user_id: i64) -> bool {
        self.is_admin() || self.id == user_id
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            full_name: user.full_name,
            location: user.location,
            contact_number: user.contact_number,
            id_picture: user.id_picture,
            is_approved: user.is_approved,
            created_at: user.created_at,
        }
    }
}

/// Author reference embedded in expanded posts, comments and messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: i64,
    pub username: String,
    pub full_name: String,
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// The single administrator account
    Admin,
    /// Regular community member
    #[default]
    User,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::User => write!(f, "user"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Which users a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    /// Every account, admin included
    All,
    /// Accounts with the approval flag set (admin included)
    Approved,
    /// Non-admin accounts still awaiting approval
    Pending,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        match self {
            UserFilter::All => true,
            UserFilter::Approved => user.is_approved,
            UserFilter::Pending => !user.is_approved && user.role == UserRole::User,
        }
    }
}

/// Input for inserting a user (secret already sealed by the credential policy)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub secret: String,
    pub role: UserRole,
    pub full_name: String,
    pub location: String,
    pub contact_number: String,
    pub id_picture: Option<String>,
    pub is_approved: bool,
}

/// Counts of records removed by an account cascade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub posts: u64,
    pub comments: u64,
    pub messages: u64,
    pub notifications: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole, approved: bool) -> User {
        User {
            id: 7,
            username: "alice".to_string(),
            secret: "hunter2".to_string(),
            role,
            full_name: "Alice Doe".to_string(),
            location: "Springfield".to_string(),
            contact_number: "555-0100".to_string(),
            id_picture: None,
            is_approved: approved,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_authenticate() {
        assert!(user(UserRole::Admin, false).can_authenticate());
        assert!(user(UserRole::User, true).can_authenticate());
        assert!(!user(UserRole::User, false).can_authenticate());
    }

    #[test]
    fn test_profile_has_no_secret() {
        let profile = user(UserRole::User, true).profile();
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("hunter2"));
        assert_eq!(profile.username, "alice");
    }

    #[test]
    fn test_can_act_for() {
        let admin = user(UserRole::Admin, true).profile();
        let member = user(UserRole::User, true).profile();

        assert!(admin.can_act_for(99));
        assert!(member.can_act_for(7));
        assert!(!member.can_act_for(99));
    }

    #[test]
    fn test_user_filter() {
        let pending = user(UserRole::User, false);
        let approved = user(UserRole::User, true);
        let admin = user(UserRole::Admin, true);

        assert!(UserFilter::Pending.matches(&pending));
        assert!(!UserFilter::Pending.matches(&approved));
        assert!(!UserFilter::Pending.matches(&admin));
        assert!(UserFilter::Approved.matches(&admin));
        assert!(UserFilter::All.matches(&pending));
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!(UserRole::from_str("ADMIN").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("user").unwrap(), UserRole::User);
        assert!(UserRole::from_str("editor").is_err());
        assert_eq!(UserRole::default(), UserRole::User);
    }
}
