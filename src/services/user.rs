//! User service
//!
//! Access layer and account moderation:
//! - admin bootstrap at startup
//! - registration (pending until approved) and authentication
//! - approve / decline / delete accounts, with cascading deletes
//! - resolving a session's user on every request

use std::sync::Arc;

use crate::config::AdminConfig;
use crate::db::repositories::{UserRepository, UsernameTaken};
use crate::models::{
    NewNotification, NewUser, NotificationType, User, UserFilter, UserProfile, UserRole,
};
use crate::services::error::{required, ServiceError, ServiceResult};
use crate::services::image::ImagePolicy;
use crate::services::notification::NotificationService;
use crate::services::password::CredentialPolicy;

/// Registration input
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub secret: String,
    pub full_name: String,
    pub location: String,
    pub contact_number: String,
    /// Identity picture as a data URL
    pub id_picture: Option<String>,
}

/// Outcome of a successful registration
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: UserProfile,
    pub message: String,
}

/// Outcome of an account deletion
#[derive(Debug, Clone)]
pub struct DeletionOutcome {
    pub message: String,
    /// The deleted account was the caller's own, so its session is over
    pub session_terminated: bool,
}

/// User service for accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    notifications: Arc<NotificationService>,
    credentials: CredentialPolicy,
    images: ImagePolicy,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        notifications: Arc<NotificationService>,
        credentials: CredentialPolicy,
        images: ImagePolicy,
    ) -> Self {
        Self {
            user_repo,
            notifications,
            credentials,
            images,
        }
    }

    /// Make sure the admin account exists and is approved.
    ///
    /// Creates it from `config` on an empty store. Idempotent.
    pub async fn ensure_admin(&self, config: &AdminConfig) -> ServiceResult<UserProfile> {
        if let Some(admin) = self.user_repo.find_admin().await? {
            if !admin.is_approved {
                self.user_repo.set_approved(admin.id, true).await?;
                tracing::info!("Re-approved admin account {}", admin.username);
            }
            let admin = User {
                is_approved: true,
                ..admin
            };
            return Ok(admin.profile());
        }

        if self.user_repo.get_by_username(&config.username).await?.is_some() {
            return Err(ServiceError::Validation(format!(
                "Cannot create admin: username '{}' belongs to a regular account",
                config.username
            )));
        }

        let admin = self
            .user_repo
            .create(&NewUser {
                username: config.username.clone(),
                secret: self.credentials.seal(&config.secret)?,
                role: UserRole::Admin,
                full_name: config.full_name.clone(),
                location: config.location.clone(),
                contact_number: config.contact_number.clone(),
                id_picture: None,
                is_approved: true,
            })
            .await?;

        tracing::info!("Created admin account '{}'", admin.username);
        Ok(admin.profile())
    }

    /// Check credentials.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` if no account matches username and secret
    /// - `PendingApproval` if the account is a user that hasn't been approved
    pub async fn authenticate(&self, username: &str, secret: &str) -> ServiceResult<UserProfile> {
        let user = match self.user_repo.get_by_username(username.trim()).await? {
            Some(user) => user,
            None => {
                tracing::warn!("Login failed for unknown user '{}'", username);
                return Err(ServiceError::InvalidCredentials);
            }
        };

        if !self.credentials.matches(secret, &user.secret)? {
            tracing::warn!("Login failed for '{}': wrong secret", user.username);
            return Err(ServiceError::InvalidCredentials);
        }

        if !user.can_authenticate() {
            tracing::warn!("Login refused for '{}': pending approval", user.username);
            return Err(ServiceError::PendingApproval);
        }

        tracing::info!("User '{}' logged in", user.username);
        Ok(user.profile())
    }

    /// Register a new account, pending admin approval.
    ///
    /// Does not log the user in.
    pub async fn register(&self, input: RegisterInput) -> ServiceResult<Registration> {
        let username = required("Username", &input.username)?;
        if input.secret.trim().is_empty() {
            return Err(ServiceError::validation("Password is required"));
        }
        let full_name = required("Full name", &input.full_name)?;
        let location = required("Location", &input.location)?;
        let contact_number = required("Contact number", &input.contact_number)?;
        let id_picture = self.images.check("idPicture", input.id_picture)?;

        if self.user_repo.get_by_username(&username).await?.is_some() {
            return Err(ServiceError::DuplicateUsername(username));
        }

        // Stored together with the account in one write
        let notice = match self.user_repo.find_admin().await? {
            Some(admin) => Some(NewNotification {
                user_id: admin.id,
                message: format!(
                    "New account activation request from {} ({})",
                    full_name, username
                ),
                notification_type: NotificationType::AccountRequest,
            }),
            None => {
                tracing::warn!("No admin account to notify");
                None
            }
        };

        let new_user = NewUser {
            username,
            secret: self.credentials.seal(&input.secret)?,
            role: UserRole::User,
            full_name,
            location,
            contact_number,
            id_picture,
            is_approved: false,
        };

        let user = match self
            .user_repo
            .create_with_notice(&new_user, notice.as_ref())
            .await
        {
            Ok(user) => user,
            // Lost a race with a concurrent registration of the same name
            Err(e) if e.downcast_ref::<UsernameTaken>().is_some() => {
                return Err(ServiceError::DuplicateUsername(new_user.username));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!("User '{}' registered, awaiting approval", user.username);
        Ok(Registration {
            user: user.profile(),
            message: "Registration successful! Your account activation request has been sent to the admin."
                .to_string(),
        })
    }

    /// List accounts. Everyone may list approved accounts; the full and
    /// pending lists are admin-only.
    pub async fn list_users(
        &self,
        actor: &UserProfile,
        filter: UserFilter,
    ) -> ServiceResult<Vec<UserProfile>> {
        if filter != UserFilter::Approved && !actor.is_admin() {
            return Err(ServiceError::forbidden("Admin access required"));
        }

        let users = self.user_repo.list(filter).await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    /// Approve an account and tell its owner.
    pub async fn approve_user(&self, actor: &UserProfile, id: i64) -> ServiceResult<String> {
        require_admin(actor)?;
        let user = self.find(id).await?;

        if !self.user_repo.set_approved(user.id, true).await? {
            return Err(ServiceError::NotFound("User"));
        }

        self.notifications
            .notify(
                user.id,
                "Your account has been approved! You can now log in.",
                NotificationType::Success,
            )
            .await?;

        tracing::info!("Account '{}' approved by '{}'", user.username, actor.username);
        Ok("Account approved successfully".to_string())
    }

    /// Decline a pending account, removing it outright.
    pub async fn decline_user(&self, actor: &UserProfile, id: i64) -> ServiceResult<String> {
        require_admin(actor)?;
        let user = self.find(id).await?;

        if user.is_admin() {
            return Err(ServiceError::validation("The admin account cannot be declined"));
        }
        if user.is_approved {
            return Err(ServiceError::validation(
                "Only pending accounts can be declined",
            ));
        }

        self.user_repo
            .delete_cascade(user.id)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        tracing::info!("Account '{}' declined by '{}'", user.username, actor.username);
        Ok("Account declined and deleted".to_string())
    }

    /// Delete an account and everything attached to it.
    ///
    /// Allowed for the admin and for the account owner.
    pub async fn delete_user(&self, actor: &UserProfile, id: i64) -> ServiceResult<DeletionOutcome> {
        if !actor.can_act_for(id) {
            return Err(ServiceError::forbidden("You can only delete your own account"));
        }
        let user = self.find(id).await?;

        if user.is_admin() {
            return Err(ServiceError::validation("The admin account cannot be deleted"));
        }

        let report = self
            .user_repo
            .delete_cascade(user.id)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        tracing::info!(
            "Account '{}' deleted by '{}' ({} posts, {} comments, {} messages, {} notifications)",
            user.username,
            actor.username,
            report.posts,
            report.comments,
            report.messages,
            report.notifications
        );

        Ok(DeletionOutcome {
            message: "Account and all associated data deleted successfully".to_string(),
            session_terminated: actor.id == user.id,
        })
    }

    /// The user behind a session, if it may still act.
    ///
    /// Always read from the store so deleted or unapproved accounts lose
    /// their sessions immediately.
    pub async fn resolve_session(&self, user_id: i64) -> ServiceResult<Option<UserProfile>> {
        let user = self.user_repo.get_by_id(user_id).await?;
        Ok(user.filter(User::can_authenticate).map(UserProfile::from))
    }

    async fn find(&self, id: i64) -> ServiceResult<User> {
        self.user_repo
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("User"))
    }
}

/// Fail with `Forbidden` unless the actor is the admin
pub(crate) fn require_admin(actor: &UserProfile) -> ServiceResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::forbidden("Admin access required"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::UploadConfig;
    use crate::db::repositories::tests::{both_backends, sqlite_store};
    use crate::db::Store;

    pub(crate) fn user_service(store: &Store) -> UserService {
        let notifications = Arc::new(NotificationService::new(
            store.notifications.clone(),
            store.users.clone(),
        ));
        UserService::new(
            store.users.clone(),
            notifications,
            CredentialPolicy::new(true),
            ImagePolicy::new(UploadConfig::default()),
        )
    }

    pub(crate) fn register_input(username: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            secret: "secret123".to_string(),
            full_name: format!("{} Example", username),
            location: "Barangay Uno".to_string(),
            contact_number: "0917-000-0000".to_string(),
            id_picture: None,
        }
    }

    async fn setup() -> (Store, UserService, UserProfile) {
        let store = sqlite_store().await;
        let service = user_service(&store);
        let admin = service.ensure_admin(&AdminConfig::default()).await.unwrap();
        (store, service, admin)
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let (store, service, admin) = setup().await;
        assert_eq!(admin.role, UserRole::Admin);
        assert!(admin.is_approved);

        let again = service.ensure_admin(&AdminConfig::default()).await.unwrap();
        assert_eq!(again.id, admin.id);
        assert_eq!(store.users.list(UserFilter::All).await.unwrap().len(), 1);

        let stored = store.users.get_by_id(admin.id).await.unwrap().unwrap();
        assert!(stored.secret.starts_with("$argon2id$"));
        service.authenticate("admin", "admin123").await.unwrap();
    }

    #[tokio::test]
    async fn test_pending_user_cannot_log_in() {
        let (_, service, _) = setup().await;
        service.register(register_input("alice")).await.unwrap();

        assert!(matches!(
            service.authenticate("alice", "secret123").await,
            Err(ServiceError::PendingApproval)
        ));
        assert!(matches!(
            service.authenticate("alice", "wrong").await,
            Err(ServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            service.authenticate("nobody", "secret123").await,
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_registration_approval_flow() {
        let (store, service, admin) = setup().await;

        let registration = service.register(register_input("alice")).await.unwrap();
        assert!(!registration.user.is_approved);
        assert_eq!(registration.user.role, UserRole::User);

        let admin_notes = store.notifications.list_for_user(admin.id).await.unwrap();
        assert_eq!(admin_notes.len(), 1);
        assert_eq!(admin_notes[0].notification_type, NotificationType::AccountRequest);
        assert_eq!(
            admin_notes[0].message,
            "New account activation request from alice Example (alice)"
        );

        let pending = service.list_users(&admin, UserFilter::Pending).await.unwrap();
        assert_eq!(pending.len(), 1);

        service.approve_user(&admin, registration.user.id).await.unwrap();
        let alice = service.authenticate("alice", "secret123").await.unwrap();
        assert!(alice.is_approved);

        let alice_notes = store.notifications.list_for_user(alice.id).await.unwrap();
        assert_eq!(alice_notes.len(), 1);
        assert_eq!(alice_notes[0].notification_type, NotificationType::Success);
        assert!(service.list_users(&admin, UserFilter::Pending).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let (store, service, _) = setup().await;
        service.register(register_input("alice")).await.unwrap();

        let mut input = register_input("alice");
        input.username = "  alice ".to_string();
        assert!(matches!(
            service.register(input).await,
            Err(ServiceError::DuplicateUsername(_))
        ));
        assert_eq!(store.users.list(UserFilter::All).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_registration_same_username() {
        for (backend, store) in both_backends().await {
            let service = user_service(&store);
            let admin = service.ensure_admin(&AdminConfig::default()).await.unwrap();

            let (a, b) = tokio::join!(
                service.register(register_input("alice")),
                service.register(register_input("alice"))
            );

            let results = [a, b];
            let created = results.iter().filter(|r| r.is_ok()).count();
            let duplicates = results
                .iter()
                .filter(|r| matches!(r, Err(ServiceError::DuplicateUsername(_))))
                .count();
            assert_eq!((created, duplicates), (1, 1), "{backend}");

            let alices = store.users.list(UserFilter::Pending).await.unwrap();
            assert_eq!(alices.len(), 1, "{backend}");

            // Only the winning registration reaches the admin
            let notes = store.notifications.list_for_user(admin.id).await.unwrap();
            assert_eq!(notes.len(), 1, "{backend}");
        }
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (_, service, _) = setup().await;

        let mut input = register_input("alice");
        input.full_name = "   ".to_string();
        assert!(matches!(
            service.register(input).await,
            Err(ServiceError::Validation(_))
        ));

        let mut input = register_input("alice");
        input.id_picture = Some("not a data url".to_string());
        assert!(matches!(
            service.register(input).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_decline_only_pending() {
        let (store, service, admin) = setup().await;
        let alice = service.register(register_input("alice")).await.unwrap().user;
        let bob = service.register(register_input("bob")).await.unwrap().user;
        service.approve_user(&admin, bob.id).await.unwrap();

        service.decline_user(&admin, alice.id).await.unwrap();
        assert!(store.users.get_by_id(alice.id).await.unwrap().is_none());

        assert!(matches!(
            service.decline_user(&admin, bob.id).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.decline_user(&admin, admin.id).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.decline_user(&admin, 9999).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_moderation_requires_admin() {
        let (_, service, admin) = setup().await;
        let alice = service.register(register_input("alice")).await.unwrap().user;
        service.approve_user(&admin, alice.id).await.unwrap();
        let bob = service.register(register_input("bob")).await.unwrap().user;

        assert!(matches!(
            service.approve_user(&alice, bob.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.list_users(&alice, UserFilter::All).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert_eq!(service.list_users(&alice, UserFilter::Approved).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let (_, service, admin) = setup().await;
        let alice = service.register(register_input("alice")).await.unwrap().user;
        let bob = service.register(register_input("bob")).await.unwrap().user;
        service.approve_user(&admin, alice.id).await.unwrap();

        assert!(matches!(
            service.delete_user(&alice, bob.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete_user(&admin, admin.id).await,
            Err(ServiceError::Validation(_))
        ));

        let by_admin = service.delete_user(&admin, bob.id).await.unwrap();
        assert!(!by_admin.session_terminated);

        let own = service.delete_user(&alice, alice.id).await.unwrap();
        assert!(own.session_terminated);
        assert!(service.resolve_session(alice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_session() {
        let (_, service, admin) = setup().await;
        let alice = service.register(register_input("alice")).await.unwrap().user;

        assert!(service.resolve_session(alice.id).await.unwrap().is_none());
        service.approve_user(&admin, alice.id).await.unwrap();
        assert_eq!(
            service.resolve_session(alice.id).await.unwrap().unwrap().username,
            "alice"
        );
        assert!(service.resolve_session(admin.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_verbatim_secrets_when_hashing_off() {
        let store = sqlite_store().await;
        let notifications = Arc::new(NotificationService::new(
            store.notifications.clone(),
            store.users.clone(),
        ));
        let service = UserService::new(
            store.users.clone(),
            notifications,
            CredentialPolicy::new(false),
            ImagePolicy::new(UploadConfig::default()),
        );
        let admin = service.ensure_admin(&AdminConfig::default()).await.unwrap();

        let stored = store.users.get_by_id(admin.id).await.unwrap().unwrap();
        assert_eq!(stored.secret, "admin123");
        service.authenticate("admin", "admin123").await.unwrap();
    }
}
