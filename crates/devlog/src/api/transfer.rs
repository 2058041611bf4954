//! Migrate, merge and verify endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use devlog_core::{
    DevlogState, MergeReport, MigrateReport, TransferResult, TransferService, VerifyReport,
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use super::non_empty;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TableRequest {
    table: Option<String>,
}

impl TableRequest {
    fn into_table(body: Result<Json<Self>, JsonRejection>) -> Result<String, ApiError> {
        let Json(req) = body?;
        non_empty(req.table).ok_or_else(|| ApiError::bad_request("missing table parameter"))
    }
}

/// A report with the dashboard's success envelope.
#[derive(Serialize)]
pub struct Outcome<T> {
    success: bool,
    message: String,
    #[serde(flatten)]
    report: T,
}

#[derive(Serialize)]
pub struct MigrateAllOutcome {
    success: bool,
    results: Vec<TransferResult>,
}

/// `POST /api/migrate {table}`
pub async fn migrate(
    State(state): State<Arc<DevlogState>>,
    body: Result<Json<TableRequest>, JsonRejection>,
) -> ApiResult<Outcome<MigrateReport>> {
    let table = TableRequest::into_table(body)?;
    let report = TransferService::migrate(&state, &table).await?;
    Ok(Json(Outcome { success: true, message: report.message(), report }))
}

/// `POST /api/migrate-all`
pub async fn migrate_all(State(state): State<Arc<DevlogState>>) -> ApiResult<MigrateAllOutcome> {
    let results = TransferService::migrate_all(&state).await?;
    Ok(Json(MigrateAllOutcome { success: true, results }))
}

/// `POST /api/merge {table}`
pub async fn merge(
    State(state): State<Arc<DevlogState>>,
    body: Result<Json<TableRequest>, JsonRejection>,
) -> ApiResult<Outcome<MergeReport>> {
    let table = TableRequest::into_table(body)?;
    let report = TransferService::merge(&state, &table).await?;
    Ok(Json(Outcome { success: true, message: report.message(), report }))
}

/// `POST /api/verify {table}`
pub async fn verify(
    State(state): State<Arc<DevlogState>>,
    body: Result<Json<TableRequest>, JsonRejection>,
) -> ApiResult<VerifyReport> {
    let table = TableRequest::into_table(body)?;
    Ok(Json(TransferService::verify(&state, &table).await?))
}
