//! Environment status endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use devlog_core::{DevlogState, Environment, EnvironmentStatus};

/// `GET /api/environments`
///
/// Probes each configured pool with `SELECT version()`.
pub async fn list_environments(
    State(state): State<Arc<DevlogState>>,
) -> Json<BTreeMap<Environment, EnvironmentStatus>> {
    Json(state.environment_statuses().await)
}
