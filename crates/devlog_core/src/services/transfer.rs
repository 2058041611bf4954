//! Table transfer between the offline and online environments.
//!
//! Rows are read from offline in full and replayed into online one
//! statement at a time. Columns whose types agree travel in their binary wire
//! encoding; the rest travel as text and are cast by the online server.
//! Nothing runs inside a transaction: rows inserted before a failure stay
//! committed.

use pg_escape::quote_identifier;
use tokio_postgres::types::Type;
use tokio_postgres::Statement;

use crate::error::DevlogError;
use crate::models::{
    base_type, ColumnInfo, MergeReport, MigrateReport, RowSet, TransferResult, VerifyReport,
};
use crate::services::connection::PooledConnection;
use crate::services::log_ring::LogRing;
use crate::services::schema::{count_sql, select_all_sql, SchemaService};
use crate::state::DevlogState;

/// Transfer engine. Source is always offline, destination always online.
pub struct TransferService;

impl TransferService {
    /// Replace the online copy of a table with the offline rows.
    ///
    /// An empty source table leaves the destination untouched.
    pub async fn migrate(state: &DevlogState, table: &str) -> Result<MigrateReport, DevlogError> {
        let (offline, online) = state.transfer_pools()?;
        let logs = state.logs();
        logs.info(format!("migrating table [{table}]"));

        let result: Result<MigrateReport, DevlogError> = async {
            let source = offline.get().await?;
            let dest = online.get().await?;
            Self::migrate_table(&source, &dest, table, logs).await
        }
        .await;

        if let Err(e) = &result {
            logs.error(format!("migration failed [{table}]"), e);
        }
        result
    }

    /// Migrate every table of the offline `public` schema.
    ///
    /// Failures are isolated per table; only a failure to list the tables
    /// fails the whole call.
    pub async fn migrate_all(state: &DevlogState) -> Result<Vec<TransferResult>, DevlogError> {
        let (offline, online) = state.transfer_pools()?;
        let logs = state.logs();
        logs.info("migrating all tables");

        let result: Result<Vec<TransferResult>, DevlogError> = async {
            let source = offline.get().await?;
            let dest = online.get().await?;
            let tables = SchemaService::list_tables(&source).await?;

            let mut results = Vec::with_capacity(tables.len());
            for table in tables {
                match Self::migrate_table(&source, &dest, &table, logs).await {
                    Ok(report) if !report.truncated => results.push(TransferResult::skipped(table)),
                    Ok(report) => results.push(TransferResult::success(table, report.row_count)),
                    Err(e) => {
                        logs.error(format!("migration failed [{table}]"), &e);
                        results.push(TransferResult::failed(table, e.to_string()));
                    }
                }
            }
            Ok(results)
        }
        .await;

        if let Err(e) = &result {
            logs.error("migrating all tables failed", e);
        }
        result
    }

    /// Add offline rows to online, skipping rows that collide on a unique key.
    pub async fn merge(state: &DevlogState, table: &str) -> Result<MergeReport, DevlogError> {
        let (offline, online) = state.transfer_pools()?;
        let logs = state.logs();
        logs.info(format!("merging table [{table}]"));

        let result: Result<MergeReport, DevlogError> = async {
            let source = offline.get().await?;
            let dest = online.get().await?;
            Self::merge_table(&source, &dest, table, logs).await
        }
        .await;

        if let Err(e) = &result {
            logs.error(format!("merge failed [{table}]"), e);
        }
        result
    }

    /// Compare row counts of a table in both environments.
    pub async fn verify(state: &DevlogState, table: &str) -> Result<VerifyReport, DevlogError> {
        let (offline, online) = state.transfer_pools()?;
        let logs = state.logs();
        logs.info(format!("verifying table [{table}]"));

        let result: Result<VerifyReport, DevlogError> = async {
            let offline_rows = SchemaService::count_rows(&offline.get().await?, table).await?;
            let online_rows = SchemaService::count_rows(&online.get().await?, table).await?;
            Ok(VerifyReport::compare(table, offline_rows, online_rows))
        }
        .await;

        match &result {
            Ok(report) => {
                logs.info(format!(
                    "verification done [{table}]: OFFLINE={}, ONLINE={}",
                    report.offline_rows, report.online_rows
                ));
            }
            Err(e) => {
                logs.error(format!("verification failed [{table}]"), e);
            }
        }
        result
    }

    /// Read a whole table into memory.
    pub async fn read_table(conn: &PooledConnection, table: &str) -> Result<RowSet, DevlogError> {
        let statement = conn.prepare(&select_all_sql(table)).await?;
        let columns = statement.columns().iter().map(ColumnInfo::from_column).collect();
        let rows = conn.query_prepared(&statement, &[]).await?;
        Ok(RowSet::from_rows(columns, &rows)?)
    }

    async fn migrate_table(
        source: &PooledConnection,
        dest: &PooledConnection,
        table: &str,
        logs: &LogRing,
    ) -> Result<MigrateReport, DevlogError> {
        let Some((rows, insert)) = Self::prepare_transfer(source, dest, table).await? else {
            logs.warn(format!("table [{table}] is empty"));
            return Ok(MigrateReport { table: table.to_string(), row_count: 0, truncated: false });
        };

        dest.execute(&truncate_sql(table), &[]).await?;
        logs.info(format!("truncated online table [{table}]"));

        for index in 0..rows.len() {
            dest.execute_prepared(&insert, &rows.params(index)).await?;
        }

        let row_count = rows.len() as u64;
        logs.info(format!("table [{table}] migrated, {row_count} rows"));
        Ok(MigrateReport { table: table.to_string(), row_count, truncated: true })
    }

    async fn merge_table(
        source: &PooledConnection,
        dest: &PooledConnection,
        table: &str,
        logs: &LogRing,
    ) -> Result<MergeReport, DevlogError> {
        let Some((rows, insert)) = Self::prepare_transfer(source, dest, table).await? else {
            logs.warn(format!("table [{table}] is empty"));
            // Nothing to merge; a missing online table is not an error here.
            let online_count = SchemaService::count_rows(dest, table).await.unwrap_or(0);
            return Ok(MergeReport {
                table: table.to_string(),
                offline_count: 0,
                online_count_before: online_count,
                merged_count: 0,
                duplicate_count: 0,
                online_count_after: online_count,
            });
        };

        let online_count_before = SchemaService::count_rows(dest, table).await?;
        let mut merged_count = 0u64;
        let mut duplicate_count = 0u64;
        for index in 0..rows.len() {
            match dest.execute_prepared(&insert, &rows.params(index)).await {
                Ok(_) => merged_count += 1,
                Err(e) if e.is_unique_violation() => duplicate_count += 1,
                Err(e) => return Err(e),
            }
        }

        let online_count_after = SchemaService::count_rows(dest, table).await?;
        logs.info(format!(
            "table [{table}] merged, {merged_count} rows merged, {duplicate_count} duplicates"
        ));

        Ok(MergeReport {
            table: table.to_string(),
            offline_count: rows.len() as u64,
            online_count_before,
            merged_count,
            duplicate_count,
            online_count_after,
        })
    }

    /// Read the offline rows and prepare an online insert that accepts them.
    ///
    /// Returns `None` for an empty source. Everything that can reject the
    /// transfer runs here, before the destination is modified.
    async fn prepare_transfer(
        source: &PooledConnection,
        dest: &PooledConnection,
        table: &str,
    ) -> Result<Option<(RowSet, Statement)>, DevlogError> {
        let rows = Self::read_table(source, table).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let draft = dest.prepare(&build_insert_sql(table, &rows.column_names())).await?;
        let plan = TransferPlan::new(table, &rows.columns, draft.params())?;
        let (rows, insert) = if plan.is_binary() {
            (rows, draft)
        } else {
            let statement = source.prepare(&plan.select_sql()).await?;
            let columns = statement.columns().iter().map(ColumnInfo::from_column).collect();
            let rows = RowSet::from_rows(columns, &source.query_prepared(&statement, &[]).await?)?;
            plan.check_casts(dest, &rows).await?;
            (rows, dest.prepare(&plan.insert_sql()).await?)
        };

        check_param_types(table, &rows.columns, insert.params())?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some((rows, insert)))
    }
}

/// How one column travels from offline to online.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ColumnRoute {
    /// Same base type on both sides; wire bytes are replayed unchanged.
    Binary,
    /// Read as text offline and cast by the online server.
    Cast {
        /// Offline type name
        from: String,
        /// Online type name
        to: String,
        /// Schema-qualified, quoted online type for the cast
        target: String,
    },
}

/// Column routes for one table transfer.
#[derive(Debug, Clone)]
struct TransferPlan {
    table: String,
    columns: Vec<String>,
    routes: Vec<ColumnRoute>,
}

impl TransferPlan {
    /// Pair each offline column with the online insert parameter for it.
    fn new(table: &str, columns: &[ColumnInfo], params: &[Type]) -> Result<Self, DevlogError> {
        check_param_count(table, columns.len(), params.len())?;

        let routes = columns
            .iter()
            .zip(params)
            .map(|(column, param)| {
                if column.type_name == base_type(param).name() {
                    ColumnRoute::Binary
                } else {
                    ColumnRoute::Cast {
                        from: column.type_name.clone(),
                        to: param.name().to_string(),
                        target: format!(
                            "{}.{}",
                            quote_identifier(param.schema()),
                            quote_identifier(param.name())
                        ),
                    }
                }
            })
            .collect();

        Ok(Self {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.name.clone()).collect(),
            routes,
        })
    }

    fn is_binary(&self) -> bool {
        self.routes.iter().all(|r| *r == ColumnRoute::Binary)
    }

    /// Offline SELECT with cast columns rendered as text.
    fn select_sql(&self) -> String {
        let list: Vec<_> = self
            .columns
            .iter()
            .zip(&self.routes)
            .map(|(name, route)| {
                let name = quote_identifier(name);
                match route {
                    ColumnRoute::Binary => name.to_string(),
                    ColumnRoute::Cast { .. } => format!("{name}::text AS {name}"),
                }
            })
            .collect();
        format!("SELECT {} FROM {}", list.join(", "), quote_identifier(&self.table))
    }

    /// Online INSERT casting text parameters to their column types.
    fn insert_sql(&self) -> String {
        let placeholders: Vec<_> = self
            .routes
            .iter()
            .enumerate()
            .map(|(i, route)| match route {
                ColumnRoute::Binary => format!("${}", i + 1),
                ColumnRoute::Cast { target, .. } => format!("${}::text::{target}", i + 1),
            })
            .collect();
        let names: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        insert_sql_with(&self.table, &names, &placeholders)
    }

    /// Run every cast on the online server without writing anything.
    async fn check_casts(&self, dest: &PooledConnection, rows: &RowSet) -> Result<(), DevlogError> {
        for (index, route) in self.routes.iter().enumerate() {
            let ColumnRoute::Cast { from, to, target } = route else {
                continue;
            };
            let values: Vec<Option<String>> = rows.rows.iter().map(|row| row[index].as_text()).collect();
            let sql = format!("SELECT v::{target} FROM unnest($1::text[]) AS u(v)");
            if let Err(e) = dest.query(&sql, &[&values]).await {
                return Err(DevlogError::transfer(
                    &self.table,
                    format!(
                        "column \"{}\" cannot be converted from {from} to {to}: {e}",
                        self.columns[index]
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Build a positional INSERT for the given columns.
pub fn build_insert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders: Vec<_> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    insert_sql_with(table, columns, &placeholders)
}

fn insert_sql_with(table: &str, columns: &[&str], placeholders: &[String]) -> String {
    let table = quote_identifier(table);
    if columns.is_empty() {
        return format!("INSERT INTO {table} DEFAULT VALUES");
    }

    let names: Vec<_> = columns.iter().map(|c| quote_identifier(c)).collect();
    format!("INSERT INTO {table} ({}) VALUES ({})", names.join(", "), placeholders.join(", "))
}

/// Empty a destination table, cascading to dependent tables.
pub fn truncate_sql(table: &str) -> String {
    format!("TRUNCATE TABLE {} CASCADE", quote_identifier(table))
}

fn check_param_count(table: &str, columns: usize, params: usize) -> Result<(), DevlogError> {
    if columns != params {
        return Err(DevlogError::transfer(
            table,
            format!("offline table has {columns} columns but the online insert takes {params}"),
        ));
    }
    Ok(())
}

/// Verify the prepared insert takes each column's values as read.
///
/// Binary values are replayed unchanged, so base type names must match.
fn check_param_types(
    table: &str,
    columns: &[ColumnInfo],
    params: &[Type],
) -> Result<(), DevlogError> {
    check_param_count(table, columns.len(), params.len())?;

    for (column, ty) in columns.iter().zip(params) {
        if column.type_name != base_type(ty).name() {
            return Err(DevlogError::transfer(
                table,
                format!(
                    "column \"{}\" is {} offline but {} online",
                    column.name,
                    column.type_name,
                    ty.name()
                ),
            ));
        }
    }
    Ok(())
}
