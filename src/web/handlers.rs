//! HTTP handlers for API endpoints.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json};
use serde::Serialize;
use tracing::error;

use crate::error::StatsError;
use crate::metrics::{MetricsSource, Snapshot};
use crate::web::router::AppState;

/// Service metadata served at `/`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

impl ServiceDescriptor {
    pub fn current() -> Self {
        Self {
            name: "System Stats API",
            version: env!("CARGO_PKG_VERSION"),
            description: "API for monitoring system resources and processes",
            endpoints: BTreeMap::from([
                ("/api/stats", "Get current system statistics"),
                ("/api/events", "SSE endpoint for real-time system statistics"),
            ]),
        }
    }
}

/// Describe the service and its endpoints.
pub async fn index() -> Json<ServiceDescriptor> {
    Json(ServiceDescriptor::current())
}

/// Get current system snapshot as JSON.
///
/// A failed core metric turns into a 500 whose plain-text body is the error message.
pub async fn get_stats<S: MetricsSource>(
    State(state): State<AppState<S>>,
) -> Result<Json<Snapshot>, StatsError> {
    state.assembler.sample().await.map(Json).map_err(|e| {
        error!("Failed to collect snapshot: {}", e);
        e
    })
}

/// Reject a method the API does not serve.
pub async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET")])
}
