//! Log ring endpoints.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use devlog_core::{DevlogState, LevelFilter, LogPage};
use serde::Deserialize;

use super::error::{ApiError, ApiResult};
use super::StatusMessage;

const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LogsParams {
    level: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

/// `GET /api/logs?level&limit&offset`
pub async fn list_logs(
    State(state): State<Arc<DevlogState>>,
    params: Result<Query<LogsParams>, QueryRejection>,
) -> ApiResult<LogPage> {
    let Query(params) = params?;
    let filter = LevelFilter::from_param(params.level.as_deref()).map_err(ApiError::bad_request)?;
    let page = state.logs().page(
        filter,
        params.limit.unwrap_or(DEFAULT_LIMIT),
        params.offset.unwrap_or(0),
    );
    Ok(Json(page))
}

/// `POST /api/logs/clear`
pub async fn clear_logs(State(state): State<Arc<DevlogState>>) -> Json<StatusMessage> {
    state.logs().clear();
    state.logs().info("logs cleared");
    Json(StatusMessage::ok("logs cleared"))
}
