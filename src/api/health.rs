//! Health check endpoint

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::api::middleware::AppState;
use crate::config::StoreDriver;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub store: StoreDriver,
    pub store_connected: bool,
}

/// GET /api/health
///
/// Returns 200 when the store answers a ping, 503 otherwise.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let connected = match tokio::time::timeout(PING_TIMEOUT, state.backend.ping()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!("Store ping failed: {:#}", e);
            false
        }
        Err(_) => {
            tracing::warn!("Store ping timed out after {:?}", PING_TIMEOUT);
            false
        }
    };

    let (status_code, status) = if connected {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            store: state.driver,
            store_connected: connected,
        }),
    )
}
