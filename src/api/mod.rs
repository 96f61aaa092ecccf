//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api`:
//! - Auth endpoints (login, signup, current user)
//! - User moderation endpoints
//! - Post endpoints
//! - Comment endpoints
//! - Direct message endpoints
//! - Notification endpoints
//! - Health check

pub mod auth;
pub mod comments;
pub mod health;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod posts;
pub mod responses;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .merge(users::admin_router())
        .merge(posts::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .merge(users::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(messages::router())
        .merge(notifications::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/auth", auth::public_router())
        .merge(posts::public_router())
        .merge(admin_routes)
        .merge(protected_routes)
}

fn cors_layer(cors_origin: &str) -> CorsLayer {
    let origin = if cors_origin == "*" {
        AllowOrigin::any()
    } else {
        match cors_origin.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!("Invalid CORS origin '{}', allowing any origin", cors_origin);
                AllowOrigin::any()
            }
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::repositories::tests::both_backends;
    use crate::db::Store;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    async fn test_server(store: &Store) -> TestServer {
        let mut config = Config::default();
        config.auth.token_secret = Some("test-secret".to_string());
        config.auth.hash_secrets = false;

        let state = AppState::new(store, &config).unwrap();
        state.user_service.ensure_admin(&config.admin).await.unwrap();

        TestServer::new(build_router(state, "*")).unwrap()
    }

    async fn login(server: &TestServer, username: &str, secret: &str) -> String {
        let response = server
            .post("/api/auth/login")
            .json(&json!({ "username": username, "password": secret }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn signup(server: &TestServer, username: &str) -> Value {
        let response = server
            .post("/api/auth/signup")
            .json(&json!({
                "username": username,
                "password": "secret123",
                "fullName": format!("{} Example", username),
                "location": "Barangay 1",
                "contactNumber": "0917 000 0000",
            }))
            .await;
        response.json::<Value>()
    }

    /// Register and approve an account, returning (id, token)
    async fn approved_user(server: &TestServer, admin: &str, username: &str) -> (i64, String) {
        signup(server, username).await;
        let pending = server
            .get("/api/users/pending")
            .authorization_bearer(admin)
            .await
            .json::<Value>();
        let id = pending
            .as_array()
            .unwrap()
            .iter()
            .find(|u| u["username"] == username)
            .unwrap()["id"]
            .as_i64()
            .unwrap();

        server
            .put(&format!("/api/users/{}/approve", id))
            .authorization_bearer(admin)
            .await
            .assert_status_ok();

        (id, login(server, username, "secret123").await)
    }

    async fn notification_types(server: &TestServer, token: &str, user_id: i64) -> Vec<String> {
        server
            .get(&format!("/api/notifications/user/{}", user_id))
            .authorization_bearer(token)
            .await
            .json::<Vec<Value>>()
            .iter()
            .map(|n| n["type"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_admin_exists_after_startup() {
        for (backend, store) in both_backends().await {
            let server = test_server(&store).await;
            let token = login(&server, "admin", "admin123").await;

            let me = server
                .get("/api/auth/me")
                .authorization_bearer(&token)
                .await
                .json::<Value>();
            assert_eq!(me["role"], "admin", "{backend}");
            assert_eq!(me["isApproved"], true, "{backend}");
            assert!(me.get("secret").is_none(), "{backend}");
        }
    }

    #[tokio::test]
    async fn test_registration_and_approval_flow() {
        for (backend, store) in both_backends().await {
            let server = test_server(&store).await;
            let admin = login(&server, "admin", "admin123").await;

            let body = signup(&server, "alice").await;
            assert_eq!(body["success"], true, "{backend}");

            // Pending accounts cannot log in even with the right secret
            let response = server
                .post("/api/auth/login")
                .json(&json!({ "username": "alice", "secret": "secret123" }))
                .await;
            response.assert_status(StatusCode::FORBIDDEN);
            assert_eq!(response.json::<Value>()["code"], "PENDING_APPROVAL");

            let me = server
                .get("/api/auth/me")
                .authorization_bearer(&admin)
                .await
                .json::<Value>();
            let admin_id = me["id"].as_i64().unwrap();
            assert!(notification_types(&server, &admin, admin_id)
                .await
                .contains(&"account_request".to_string()));

            let (alice_id, alice) = approved_user(&server, &admin, "alice").await;
            assert_eq!(
                notification_types(&server, &alice, alice_id).await,
                vec!["success".to_string()],
                "{backend}"
            );
        }
    }

    #[tokio::test]
    async fn test_login_failures() {
        for (_, store) in both_backends().await {
            let server = test_server(&store).await;

            let response = server
                .post("/api/auth/login")
                .json(&json!({ "username": "admin", "secret": "wrong" }))
                .await;
            response.assert_status(StatusCode::UNAUTHORIZED);
            assert_eq!(
                response.json::<Value>()["error"],
                "Invalid username or password"
            );

            let response = server
                .post("/api/auth/login")
                .json(&json!({ "username": "ghost", "secret": "x" }))
                .await;
            response.assert_status(StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_duplicate_signup_rejected() {
        for (backend, store) in both_backends().await {
            let server = test_server(&store).await;
            let admin = login(&server, "admin", "admin123").await;

            signup(&server, "alice").await;
            let response = server
                .post("/api/auth/signup")
                .json(&json!({
                    "username": "alice",
                    "secret": "other",
                    "fullName": "Alice Again",
                    "location": "Elsewhere",
                    "contactNumber": "1",
                }))
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(response.json::<Value>()["code"], "DUPLICATE_USERNAME");

            let users = server
                .get("/api/users")
                .authorization_bearer(&admin)
                .await
                .json::<Vec<Value>>();
            let alices = users.iter().filter(|u| u["username"] == "alice").count();
            assert_eq!(alices, 1, "{backend}");
        }
    }

    #[tokio::test]
    async fn test_post_moderation_flow() {
        for (backend, store) in both_backends().await {
            let server = test_server(&store).await;
            let admin = login(&server, "admin", "admin123").await;
            let (alice_id, alice) = approved_user(&server, &admin, "alice").await;

            let response = server
                .post("/api/posts")
                .authorization_bearer(&alice)
                .json(&json!({ "type": "lost", "content": "Lost a blue wallet near the market" }))
                .await;
            response.assert_status_ok();
            let created = response.json::<Value>();
            assert_eq!(created["post"]["isApproved"], false, "{backend}");
            assert_eq!(created["message"], "Post submitted! Waiting for admin approval.");
            let post_id = created["post"]["id"].as_i64().unwrap();

            let approved = server.get("/api/posts/approved").await.json::<Vec<Value>>();
            assert!(approved.is_empty(), "{backend}");

            let pending = server
                .get("/api/posts/pending")
                .authorization_bearer(&admin)
                .await
                .json::<Vec<Value>>();
            assert_eq!(pending.len(), 1);
            assert_eq!(pending[0]["author"]["username"], "alice");

            server
                .put(&format!("/api/posts/{}/approve", post_id))
                .authorization_bearer(&admin)
                .await
                .assert_status_ok();

            let approved = server
                .get("/api/posts/approved")
                .add_query_param("type", "lost")
                .await
                .json::<Vec<Value>>();
            assert_eq!(approved.len(), 1, "{backend}");
            assert_eq!(approved[0]["isApproved"], true);

            let found = server
                .get("/api/posts/approved")
                .add_query_param("type", "found")
                .await
                .json::<Vec<Value>>();
            assert!(found.is_empty());

            let types = notification_types(&server, &alice, alice_id).await;
            assert_eq!(types.iter().filter(|t| *t == "success").count(), 2, "{backend}");
        }
    }

    #[tokio::test]
    async fn test_admin_post_is_auto_approved() {
        for (backend, store) in both_backends().await {
            let server = test_server(&store).await;
            let admin = login(&server, "admin", "admin123").await;

            let created = server
                .post("/api/posts")
                .authorization_bearer(&admin)
                .json(&json!({ "type": "found", "content": "Found an umbrella" }))
                .await
                .json::<Value>();
            assert_eq!(created["post"]["isApproved"], true, "{backend}");
            assert_eq!(created["message"], "Post created successfully");
        }
    }

    #[tokio::test]
    async fn test_declining_post_removes_comments() {
        for (backend, store) in both_backends().await {
            let server = test_server(&store).await;
            let admin = login(&server, "admin", "admin123").await;
            let (_, alice) = approved_user(&server, &admin, "alice").await;

            let post_id = server
                .post("/api/posts")
                .authorization_bearer(&alice)
                .json(&json!({ "type": "lost", "content": "Lost my cat" }))
                .await
                .json::<Value>()["post"]["id"]
                .as_i64()
                .unwrap();

            let comment = server
                .post("/api/comments")
                .authorization_bearer(&admin)
                .json(&json!({ "postId": post_id, "content": "Seen near @alice's street" }))
                .await
                .json::<Value>();
            assert_eq!(comment["mentions"][0], "alice", "{backend}");

            server
                .delete(&format!("/api/posts/{}/decline", post_id))
                .authorization_bearer(&admin)
                .await
                .assert_status_ok();

            let response = server
                .get(&format!("/api/comments/post/{}", post_id))
                .authorization_bearer(&admin)
                .await;
            response.assert_status(StatusCode::NOT_FOUND);

            let id = comment["id"].as_i64().unwrap();
            let response = server
                .put(&format!("/api/comments/{}", id))
                .authorization_bearer(&admin)
                .json(&json!({ "content": "edited" }))
                .await;
            response.assert_status(StatusCode::NOT_FOUND);
            assert_eq!(response.json::<Value>()["error"], "Comment not found");
        }
    }

    #[tokio::test]
    async fn test_direct_message_flow() {
        for (backend, store) in both_backends().await {
            let server = test_server(&store).await;
            let admin = login(&server, "admin", "admin123").await;
            let (alice_id, alice) = approved_user(&server, &admin, "alice").await;
            let (bob_id, bob) = approved_user(&server, &admin, "bob").await;

            let sent = server
                .post("/api/messages")
                .authorization_bearer(&alice)
                .json(&json!({ "recipientId": bob_id, "content": "Is this your wallet?" }))
                .await
                .json::<Value>();
            assert_eq!(sent["sender"]["username"], "alice", "{backend}");
            assert_eq!(sent["recipient"]["username"], "bob");

            for (user_id, token) in [(alice_id, &alice), (bob_id, &bob)] {
                let messages = server
                    .get(&format!("/api/messages/user/{}", user_id))
                    .authorization_bearer(token)
                    .await
                    .json::<Vec<Value>>();
                assert_eq!(messages.len(), 1, "{backend}");
                assert_eq!(messages[0]["content"], "Is this your wallet?");
            }

            assert!(notification_types(&server, &bob, bob_id)
                .await
                .contains(&"message".to_string()));

            // Other users' inboxes are off limits
            server
                .get(&format!("/api/messages/user/{}", bob_id))
                .authorization_bearer(&alice)
                .await
                .assert_status(StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        for (backend, store) in both_backends().await {
            let server = test_server(&store).await;
            let admin = login(&server, "admin", "admin123").await;
            let (alice_id, alice) = approved_user(&server, &admin, "alice").await;

            let count = server
                .get(&format!("/api/notifications/user/{}/unread-count", alice_id))
                .authorization_bearer(&alice)
                .await
                .json::<Value>();
            assert_eq!(count["count"], 1, "{backend}");

            let notifications = server
                .get(&format!("/api/notifications/user/{}", alice_id))
                .authorization_bearer(&alice)
                .await
                .json::<Vec<Value>>();
            let id = notifications[0]["id"].as_i64().unwrap();

            for _ in 0..2 {
                let response = server
                    .put(&format!("/api/notifications/{}/read", id))
                    .authorization_bearer(&alice)
                    .await;
                response.assert_status_ok();
                assert_eq!(response.json::<Value>()["read"], true);
            }

            let count = server
                .get(&format!("/api/notifications/user/{}/unread-count", alice_id))
                .authorization_bearer(&alice)
                .await
                .json::<Value>();
            assert_eq!(count["count"], 0, "{backend}");

            server
                .put("/api/notifications/9999/read")
                .authorization_bearer(&alice)
                .await
                .assert_status(StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_self_deletion_terminates_session() {
        for (backend, store) in both_backends().await {
            let server = test_server(&store).await;
            let admin = login(&server, "admin", "admin123").await;
            let (alice_id, alice) = approved_user(&server, &admin, "alice").await;

            server
                .post("/api/posts")
                .authorization_bearer(&alice)
                .json(&json!({ "type": "lost", "content": "Lost keys" }))
                .await
                .assert_status_ok();

            let response = server
                .delete(&format!("/api/users/{}", alice_id))
                .authorization_bearer(&alice)
                .await;
            response.assert_status_ok();
            assert_eq!(response.json::<Value>()["sessionTerminated"], true, "{backend}");

            server
                .get("/api/auth/me")
                .authorization_bearer(&alice)
                .await
                .assert_status(StatusCode::UNAUTHORIZED);

            let pending = server
                .get("/api/posts/pending")
                .authorization_bearer(&admin)
                .await
                .json::<Vec<Value>>();
            assert!(pending.is_empty(), "{backend}");
        }
    }

    #[tokio::test]
    async fn test_route_guards() {
        let (_, store) = both_backends().await.remove(1);
        let server = test_server(&store).await;
        let admin = login(&server, "admin", "admin123").await;
        let (_, alice) = approved_user(&server, &admin, "alice").await;

        server
            .get("/api/auth/me")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/api/auth/me")
            .authorization_bearer("garbage")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let response = server
            .get("/api/users/pending")
            .authorization_bearer(&alice)
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["code"], "FORBIDDEN");

        // Any signed-in user may browse approved accounts
        server
            .get("/api/users/approved")
            .authorization_bearer(&alice)
            .await
            .assert_status_ok();

        let response = server
            .post("/api/posts")
            .authorization_bearer(&alice)
            .json(&json!({ "type": "stolen", "content": "?" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_admin_cannot_be_deleted() {
        let (_, store) = both_backends().await.remove(0);
        let server = test_server(&store).await;
        let admin = login(&server, "admin", "admin123").await;
        let me = server
            .get("/api/auth/me")
            .authorization_bearer(&admin)
            .await
            .json::<Value>();

        server
            .delete(&format!("/api/users/{}", me["id"]))
            .authorization_bearer(&admin)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_reports_driver() {
        for (backend, store) in both_backends().await {
            let server = test_server(&store).await;
            let response = server.get("/api/health").await;
            response.assert_status_ok();

            let body = response.json::<Value>();
            assert_eq!(body["status"], "ok");
            assert_eq!(body["store"], backend);
            assert_eq!(body["storeConnected"], true);
        }
    }
}
