//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the operations for a specific entity; the traits
//! are also implemented by the in-memory backend in `db::memory`.

pub mod comment;
pub mod message;
pub mod notification;
pub mod post;
pub mod user;

pub use comment::{CommentRepository, SqlxCommentRepository};
pub use message::{MessageRepository, SqlxMessageRepository};
pub use notification::{NotificationRepository, SqlxNotificationRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use user::{SqlxUserRepository, UserRepository, UsernameTaken};

#[cfg(test)]
pub(crate) mod tests {
    //! Helpers shared by repository and service tests, plus contract tests
    //! that every backend has to pass.

    use crate::db::memory::MemoryStore;
    use crate::db::{create_test_pool, migrations::run_migrations, Store};
    use crate::models::{
        NewComment, NewMessage, NewNotification, NewPost, NewUser, NotificationType, PostType,
        UserFilter, UserRole,
    };

    /// Store backed by a migrated in-memory SQLite database
    pub(crate) async fn sqlite_store() -> Store {
        let pool = create_test_pool().await.expect("Failed to create pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        Store::sqlite(pool)
    }

    /// Store backed by the in-memory tables, without a snapshot file
    pub(crate) fn memory_store() -> Store {
        Store::memory(MemoryStore::new())
    }

    pub(crate) fn new_user(username: &str, role: UserRole) -> NewUser {
        NewUser {
            username: username.to_string(),
            secret: "secret".to_string(),
            role,
            full_name: format!("{} Example", username),
            location: "Town Hall".to_string(),
            contact_number: "555-0100".to_string(),
            id_picture: None,
            is_approved: role == UserRole::Admin,
        }
    }

    pub(crate) fn new_post(author_id: i64, post_type: PostType, approved: bool) -> NewPost {
        NewPost {
            author_id,
            post_type,
            content: "Black wallet near the market".to_string(),
            image: None,
            is_approved: approved,
        }
    }

    pub(crate) async fn both_backends() -> Vec<(&'static str, Store)> {
        vec![("sqlite", sqlite_store().await), ("memory", memory_store())]
    }

    #[tokio::test]
    async fn test_user_cascade_removes_every_dependent() {
        for (backend, store) in both_backends().await {
            let alice = store.users.create(&new_user("alice", UserRole::User)).await.unwrap();
            let bob = store.users.create(&new_user("bob", UserRole::User)).await.unwrap();

            let alice_post = store.posts.create(&new_post(alice.id, PostType::Lost, true)).await.unwrap();
            let bob_post = store.posts.create(&new_post(bob.id, PostType::Found, true)).await.unwrap();

            // bob comments on alice's post, alice comments on bob's post
            let on_alice = store
                .comments
                .create(&NewComment {
                    post_id: alice_post.id,
                    author_id: bob.id,
                    content: "Saw it yesterday".to_string(),
                })
                .await
                .unwrap();
            let by_alice = store
                .comments
                .create(&NewComment {
                    post_id: bob_post.id,
                    author_id: alice.id,
                    content: "That's mine".to_string(),
                })
                .await
                .unwrap();
            let bob_own = store
                .comments
                .create(&NewComment {
                    post_id: bob_post.id,
                    author_id: bob.id,
                    content: "Still here".to_string(),
                })
                .await
                .unwrap();

            store
                .messages
                .create(&NewMessage {
                    sender_id: bob.id,
                    recipient_id: alice.id,
                    content: "hi".to_string(),
                })
                .await
                .unwrap();
            store
                .notifications
                .create(&NewNotification {
                    user_id: alice.id,
                    message: "hello".to_string(),
                    notification_type: NotificationType::Info,
                })
                .await
                .unwrap();
            let bob_note = store
                .notifications
                .create(&NewNotification {
                    user_id: bob.id,
                    message: "hello".to_string(),
                    notification_type: NotificationType::Info,
                })
                .await
                .unwrap();

            let report = store.users.delete_cascade(alice.id).await.unwrap().unwrap();
            assert_eq!(report.posts, 1, "{backend}");
            assert_eq!(report.comments, 2, "{backend}");
            assert_eq!(report.messages, 1, "{backend}");
            assert_eq!(report.notifications, 1, "{backend}");

            assert!(store.users.get_by_id(alice.id).await.unwrap().is_none(), "{backend}");
            assert!(store.posts.get_by_id(alice_post.id).await.unwrap().is_none(), "{backend}");
            assert!(store.comments.get_by_id(on_alice.id).await.unwrap().is_none(), "{backend}");
            assert!(store.comments.get_by_id(by_alice.id).await.unwrap().is_none(), "{backend}");
            assert!(store.messages.list_for_user(bob.id).await.unwrap().is_empty(), "{backend}");

            // bob's own data survives
            assert!(store.posts.get_by_id(bob_post.id).await.unwrap().is_some(), "{backend}");
            assert!(store.comments.get_by_id(bob_own.id).await.unwrap().is_some(), "{backend}");
            assert!(store.notifications.get_by_id(bob_note.id).await.unwrap().is_some(), "{backend}");

            assert!(store.users.delete_cascade(alice.id).await.unwrap().is_none(), "{backend}");
        }
    }

    #[tokio::test]
    async fn test_post_cascade_removes_comments() {
        for (backend, store) in both_backends().await {
            let alice = store.users.create(&new_user("alice", UserRole::User)).await.unwrap();
            let post = store.posts.create(&new_post(alice.id, PostType::Lost, false)).await.unwrap();
            let mut ids = Vec::new();
            for text in ["one", "two", "three"] {
                let comment = store
                    .comments
                    .create(&NewComment {
                        post_id: post.id,
                        author_id: alice.id,
                        content: text.to_string(),
                    })
                    .await
                    .unwrap();
                ids.push(comment.id);
            }

            assert_eq!(store.posts.delete_cascade(post.id).await.unwrap(), Some(3), "{backend}");
            for id in ids {
                assert!(store.comments.get_by_id(id).await.unwrap().is_none(), "{backend}");
            }
            assert_eq!(store.posts.delete_cascade(post.id).await.unwrap(), None, "{backend}");
        }
    }

    #[tokio::test]
    async fn test_listing_order_and_filters() {
        for (backend, store) in both_backends().await {
            let admin = store.users.create(&new_user("admin", UserRole::Admin)).await.unwrap();
            let alice = store.users.create(&new_user("alice", UserRole::User)).await.unwrap();

            let first = store.posts.create(&new_post(alice.id, PostType::Lost, true)).await.unwrap();
            let second = store.posts.create(&new_post(alice.id, PostType::Found, true)).await.unwrap();
            let pending = store.posts.create(&new_post(alice.id, PostType::Lost, false)).await.unwrap();

            let approved = store.posts.list(true, None).await.unwrap();
            let ids: Vec<i64> = approved.iter().map(|p| p.post.id).collect();
            assert_eq!(ids, vec![second.id, first.id], "{backend}");
            assert_eq!(approved[0].author.username, "alice", "{backend}");

            let lost = store.posts.list(true, Some(PostType::Lost)).await.unwrap();
            assert_eq!(lost.len(), 1, "{backend}");
            assert_eq!(lost[0].post.id, first.id, "{backend}");

            let waiting = store.posts.list(false, None).await.unwrap();
            assert_eq!(waiting.len(), 1, "{backend}");
            assert_eq!(waiting[0].post.id, pending.id, "{backend}");

            for text in ["first", "second"] {
                store
                    .comments
                    .create(&NewComment {
                        post_id: first.id,
                        author_id: admin.id,
                        content: text.to_string(),
                    })
                    .await
                    .unwrap();
            }
            let comments = store.comments.list_by_post(first.id).await.unwrap();
            let texts: Vec<&str> = comments.iter().map(|c| c.comment.content.as_str()).collect();
            assert_eq!(texts, vec!["first", "second"], "{backend}");

            let pending_users = store.users.list(UserFilter::Pending).await.unwrap();
            assert_eq!(pending_users.len(), 1, "{backend}");
            assert_eq!(pending_users[0].id, alice.id, "{backend}");
            assert_eq!(store.users.list(UserFilter::All).await.unwrap().len(), 2, "{backend}");
            assert_eq!(store.users.find_admin().await.unwrap().unwrap().id, admin.id, "{backend}");
        }
    }

    #[tokio::test]
    async fn test_messages_and_notifications() {
        for (backend, store) in both_backends().await {
            let alice = store.users.create(&new_user("alice", UserRole::User)).await.unwrap();
            let bob = store.users.create(&new_user("bob", UserRole::User)).await.unwrap();

            let sent = store
                .messages
                .create(&NewMessage {
                    sender_id: alice.id,
                    recipient_id: bob.id,
                    content: "found your keys".to_string(),
                })
                .await
                .unwrap();
            let expanded = store.messages.get_with_parties(sent.id).await.unwrap().unwrap();
            assert_eq!(expanded.sender.username, "alice", "{backend}");
            assert_eq!(expanded.recipient.username, "bob", "{backend}");
            assert_eq!(store.messages.list_for_user(alice.id).await.unwrap().len(), 1, "{backend}");
            assert_eq!(store.messages.list_for_user(bob.id).await.unwrap().len(), 1, "{backend}");

            let note = store
                .notifications
                .create(&NewNotification {
                    user_id: bob.id,
                    message: "New message from alice Example".to_string(),
                    notification_type: NotificationType::Message,
                })
                .await
                .unwrap();
            assert!(!note.read, "{backend}");
            assert_eq!(store.notifications.count_unread(bob.id).await.unwrap(), 1, "{backend}");

            let read = store.notifications.mark_read(note.id).await.unwrap().unwrap();
            assert!(read.read, "{backend}");
            let again = store.notifications.mark_read(note.id).await.unwrap().unwrap();
            assert!(again.read, "{backend}");
            assert_eq!(store.notifications.count_unread(bob.id).await.unwrap(), 0, "{backend}");
            assert!(store.notifications.mark_read(9999).await.unwrap().is_none(), "{backend}");
        }
    }

    #[tokio::test]
    async fn test_update_content() {
        for (backend, store) in both_backends().await {
            let alice = store.users.create(&new_user("alice", UserRole::User)).await.unwrap();
            let post = store.posts.create(&new_post(alice.id, PostType::Lost, true)).await.unwrap();

            assert!(store.posts.update_content(post.id, "Brown wallet").await.unwrap(), "{backend}");
            let fetched = store.posts.get_with_author(post.id).await.unwrap().unwrap();
            assert_eq!(fetched.post.content, "Brown wallet", "{backend}");
            assert_eq!(fetched.post.post_type, PostType::Lost, "{backend}");
            assert!(!store.posts.update_content(9999, "x").await.unwrap(), "{backend}");

            assert!(store.posts.approve(post.id).await.unwrap(), "{backend}");
            assert!(store.users.set_approved(alice.id, true).await.unwrap(), "{backend}");
            assert!(store.users.get_by_id(alice.id).await.unwrap().unwrap().is_approved, "{backend}");
        }
    }

    #[tokio::test]
    async fn test_create_with_notice_is_all_or_nothing() {
        for (backend, store) in both_backends().await {
            let admin = store.users.create(&new_user("admin", UserRole::Admin)).await.unwrap();

            let notice = NewNotification {
                user_id: admin.id,
                message: "New account activation request".to_string(),
                notification_type: NotificationType::AccountRequest,
            };
            let alice = store
                .users
                .create_with_notice(&new_user("alice", UserRole::User), Some(&notice))
                .await
                .unwrap();
            let inbox = store.notifications.list_for_user(admin.id).await.unwrap();
            assert_eq!(inbox.len(), 1, "{backend}");
            assert!(alice.id > admin.id);

            // A notice that cannot be stored takes the account down with it
            let dangling = NewNotification {
                user_id: 9999,
                ..notice
            };
            let result = store
                .users
                .create_with_notice(&new_user("bob", UserRole::User), Some(&dangling))
                .await;
            assert!(result.is_err(), "{backend}");
            assert!(store.users.get_by_username("bob").await.unwrap().is_none(), "{backend}");
        }
    }
}
