//! Ad-hoc statement execution and JSON rendering of result rows.

use crate::error::DevlogError;
use crate::models::render::{opaque_to_json, value_to_json};
use crate::models::{ColumnInfo, Environment, JsonRow, QueryResult, SqlValue};
use crate::services::connection::PooledConnection;
use crate::state::DevlogState;

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::time::Instant;
use tokio_postgres::types::Type;
use tokio_postgres::Statement;

/// Characters of SQL kept in the log ring.
const LOGGED_SQL_CHARS: usize = 100;

/// Round-trips a binary value through its type's output function.
const TEXT_CAST_SQL: &str = "SELECT $1::text";

/// Service for running caller-supplied SQL.
pub struct QueryService;

impl QueryService {
    /// Execute one statement against an environment.
    ///
    /// The SQL is trusted input and runs verbatim.
    pub async fn execute(
        state: &DevlogState,
        env: Environment,
        sql: &str,
    ) -> Result<QueryResult, DevlogError> {
        let pool = state.require_pool(env)?;
        state
            .logs()
            .info_with(format!("executing query [{env}]"), truncate_sql(sql, LOGGED_SQL_CHARS));

        let result: Result<QueryResult, DevlogError> = async {
            let conn = pool.get().await?;
            Self::run(&conn, sql).await
        }
        .await;

        if let Err(e) = &result {
            state.logs().error(format!("query failed [{env}]"), e);
        }
        result
    }

    /// Run a statement on an acquired connection.
    ///
    /// Statements without a result set report affected rows as `row_count`.
    pub async fn run(conn: &PooledConnection, sql: &str) -> Result<QueryResult, DevlogError> {
        let start = Instant::now();
        let statement = conn.prepare(sql).await?;
        let fields: Vec<ColumnInfo> =
            statement.columns().iter().map(ColumnInfo::from_column).collect();

        let (row_count, rows) = if fields.is_empty() {
            (conn.execute_prepared(&statement, &[]).await?, Vec::new())
        } else {
            let rows = conn.query_prepared(&statement, &[]).await?;
            (rows.len() as u64, rows_to_json(conn, &rows).await?)
        };

        tracing::debug!(
            env = %conn.env(),
            row_count,
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Query completed"
        );

        Ok(QueryResult { row_count, rows, fields })
    }
}

/// Truncate SQL for logging/display, respecting character boundaries.
pub fn truncate_sql(sql: &str, max_chars: usize) -> String {
    match sql.char_indices().nth(max_chars) {
        Some((idx, _)) => sql[..idx].to_string(),
        None => sql.to_string(),
    }
}

/// Render result rows as JSON objects keyed by column name.
///
/// Values without a client-side rendering are sent back to the server and
/// cast to text, so a non-null value never renders as `null`.
pub async fn rows_to_json(
    conn: &PooledConnection,
    rows: &[tokio_postgres::Row],
) -> Result<Vec<JsonRow>, DevlogError> {
    let mut text_casts = HashMap::new();
    let mut rendered = Vec::with_capacity(rows.len());
    for row in rows {
        let mut object = JsonRow::new();
        for (i, column) in row.columns().iter().enumerate() {
            let value = match row.try_get::<_, SqlValue>(i)? {
                SqlValue::Null => JsonValue::Null,
                SqlValue::Raw { ty, bytes } => match value_to_json(&ty, &bytes) {
                    Some(value) => value,
                    None => server_text(conn, &mut text_casts, &ty, &bytes).await,
                },
            };
            object.insert(column.name().to_string(), value);
        }
        rendered.push(object);
    }
    Ok(rendered)
}

/// Text form of a value as produced by the type's output function.
///
/// One `$1::text` statement is prepared per type; when the server cannot
/// provide the text the raw bytes are rendered instead.
async fn server_text(
    conn: &PooledConnection,
    text_casts: &mut HashMap<u32, Option<Statement>>,
    ty: &Type,
    bytes: &[u8],
) -> JsonValue {
    if !text_casts.contains_key(&ty.oid()) {
        let prepared = match conn.prepare_typed(TEXT_CAST_SQL, &[ty.clone()]).await {
            Ok(statement) => Some(statement),
            Err(e) => {
                tracing::warn!(type_name = ty.name(), error = %e, "No text cast for type");
                None
            }
        };
        text_casts.insert(ty.oid(), prepared);
    }

    if let Some(Some(statement)) = text_casts.get(&ty.oid()) {
        let param = SqlValue::Raw { ty: ty.clone(), bytes: bytes.to_vec() };
        match conn.query_prepared(statement, &[&param]).await {
            Ok(rows) => {
                if let Some(Ok(text)) = rows.first().map(|row| row.try_get::<_, String>(0)) {
                    return JsonValue::String(text);
                }
            }
            Err(e) => {
                tracing::warn!(type_name = ty.name(), error = %e, "Text cast failed");
            }
        }
    }
    opaque_to_json(bytes)
}
