//! Schema introspection service.
//!
//! Lists the tables of the `public` schema and reads paginated table contents
//! for the table browser.

use pg_escape::quote_identifier;

use crate::error::DevlogError;
use crate::models::{ColumnInfo, Environment, PageRequest, TablePage};
use crate::services::connection::PooledConnection;
use crate::services::query::rows_to_json;
use crate::state::DevlogState;

const LIST_TABLES_SQL: &str = r#"
    SELECT table_name
    FROM information_schema.tables
    WHERE table_schema = 'public'
    ORDER BY table_name
"#;

const TABLE_EXISTS_SQL: &str = r#"
    SELECT EXISTS (
        SELECT 1
        FROM information_schema.tables
        WHERE table_schema = 'public'
          AND table_name = $1
    )
"#;

/// Schema introspection service.
pub struct SchemaService;

impl SchemaService {
    /// List table names in the `public` schema, alphabetically.
    pub async fn list_tables(conn: &PooledConnection) -> Result<Vec<String>, DevlogError> {
        let rows = conn.query(LIST_TABLES_SQL, &[]).await?;
        Ok(rows.into_iter().map(|row| row.get::<_, String>(0)).collect())
    }

    /// Check whether a table exists in the `public` schema.
    pub async fn table_exists(conn: &PooledConnection, table: &str) -> Result<bool, DevlogError> {
        let row = conn.query_one(TABLE_EXISTS_SQL, &[&table]).await?;
        Ok(row.get(0))
    }

    /// Count the rows of a table.
    pub async fn count_rows(conn: &PooledConnection, table: &str) -> Result<i64, DevlogError> {
        let row = conn.query_one(&count_sql(table), &[]).await?;
        Ok(row.get(0))
    }

    /// List tables for an environment, logging failures to the ring.
    pub async fn list_tables_for(
        state: &DevlogState,
        env: Environment,
    ) -> Result<Vec<String>, DevlogError> {
        let pool = state.require_pool(env)?;
        let result: Result<Vec<String>, DevlogError> = async {
            let conn = pool.get().await?;
            Self::list_tables(&conn).await
        }
        .await;

        if let Err(e) = &result {
            state.logs().error(format!("table listing failed [{env}]"), e);
        }
        result
    }

    /// Read one page of a table along with its total row count.
    ///
    /// Fails with [`DevlogError::NotFound`] when the table is not in the catalog.
    pub async fn table_page(
        state: &DevlogState,
        env: Environment,
        table: &str,
        page: PageRequest,
    ) -> Result<TablePage, DevlogError> {
        let pool = state.require_pool(env)?;
        let result: Result<TablePage, DevlogError> = async {
            let conn = pool.get().await?;
            if !Self::table_exists(&conn, table).await? {
                return Err(DevlogError::not_found(table));
            }

            let total = Self::count_rows(&conn, table).await?;
            let statement = conn.prepare(&page_sql(table)).await?;
            let columns = statement.columns().iter().map(ColumnInfo::from_column).collect();
            let rows = conn.query_prepared(&statement, &[&page.limit, &page.offset]).await?;

            Ok(TablePage {
                table: table.to_string(),
                total,
                offset: page.offset,
                limit: page.limit,
                rows: rows_to_json(&conn, &rows).await?,
                columns,
            })
        }
        .await;

        match &result {
            Err(DevlogError::NotFound { .. }) => {}
            Err(e) => {
                state.logs().error(format!("table read failed [{env}:{table}]"), e);
            }
            Ok(_) => {}
        }
        result
    }
}

/// `SELECT *` for a table.
pub fn select_all_sql(table: &str) -> String {
    format!("SELECT * FROM {}", quote_identifier(table))
}

/// Row count for a table.
pub fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_identifier(table))
}

fn page_sql(table: &str) -> String {
    format!("{} LIMIT $1 OFFSET $2", select_all_sql(table))
}
