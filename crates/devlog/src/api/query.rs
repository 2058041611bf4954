//! Ad-hoc SQL endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use devlog_core::{DevlogState, Environment, QueryResult, QueryService};
use serde::Deserialize;

use super::error::{ApiError, ApiResult};
use super::non_empty;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    env: Option<String>,
    sql: Option<String>,
}

/// `POST /api/query {env, sql}`
pub async fn run_query(
    State(state): State<Arc<DevlogState>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<QueryResult> {
    let Json(req) = body?;
    let (Some(env), Some(sql)) = (non_empty(req.env), non_empty(req.sql)) else {
        return Err(ApiError::bad_request("missing env or sql parameter"));
    };
    let env: Environment = env.parse()?;

    Ok(Json(QueryService::execute(&state, env, &sql).await?))
}
