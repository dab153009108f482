//! Health check handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{state::AppState, store::DocumentStore};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service name
    pub service: String,

    /// Version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Readiness check response with dependency status
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Overall readiness status
    pub ready: bool,

    /// Service name
    pub service: String,

    /// Dependency statuses
    pub dependencies: HashMap<String, DependencyStatus>,
}

/// Individual dependency status
#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    /// Dependency is healthy
    pub healthy: bool,

    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Simple health check (liveness probe)
///
/// Always returns 200 OK if the service is running.
pub async fn health<S: DocumentStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: state.config().service.name.clone(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };

    (StatusCode::OK, Json(response))
}

/// Readiness check (readiness probe)
///
/// Returns 200 OK when the document store answers a ping and
/// 503 Service Unavailable otherwise.
pub async fn readiness<S: DocumentStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    let store = match state.store().ping().await {
        Ok(()) => DependencyStatus {
            healthy: true,
            message: Some("Connected".to_string()),
        },
        Err(e) => {
            tracing::error!("Store health check failed: {}", e);
            DependencyStatus {
                healthy: false,
                message: Some(format!("Ping failed: {}", e.kind)),
            }
        }
    };

    let ready = store.healthy;
    let mut dependencies = HashMap::new();
    dependencies.insert("store".to_string(), store);

    let response = ReadinessResponse {
        ready,
        service: state.config().service.name.clone(),
        dependencies,
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_status_omits_empty_message() {
        let status = DependencyStatus {
            healthy: true,
            message: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, serde_json::json!({ "healthy": true }));
    }

    #[test]
    fn test_readiness_response_shape() {
        let mut dependencies = HashMap::new();
        dependencies.insert(
            "store".to_string(),
            DependencyStatus {
                healthy: false,
                message: Some("Ping failed: timeout".to_string()),
            },
        );
        let response = ReadinessResponse {
            ready: false,
            service: "open311-service".to_string(),
            dependencies,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ready"], false);
        assert_eq!(json["dependencies"]["store"]["healthy"], false);
    }
}
