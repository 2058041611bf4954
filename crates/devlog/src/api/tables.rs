//! Table browsing endpoints.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use devlog_core::{DevlogState, Environment, PageRequest, SchemaService, TablePage};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};

#[derive(Serialize)]
pub struct TableList {
    tables: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    limit: Option<i64>,
    offset: Option<i64>,
}

/// `GET /api/tables/{env}`
pub async fn list_tables(
    State(state): State<Arc<DevlogState>>,
    Path(env): Path<String>,
) -> ApiResult<TableList> {
    let env: Environment = env.parse()?;
    let tables = SchemaService::list_tables_for(&state, env).await?;
    Ok(Json(TableList { tables }))
}

/// `GET /api/table/{env}/{table}?limit&offset`
pub async fn table_rows(
    State(state): State<Arc<DevlogState>>,
    Path((env, table)): Path<(String, String)>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<TablePage> {
    let env: Environment = env.parse()?;
    let Query(params) = params?;
    let page = PageRequest::new(params.limit, params.offset).map_err(ApiError::bad_request)?;

    Ok(Json(SchemaService::table_page(&state, env, &table, page).await?))
}
