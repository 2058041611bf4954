//! Query execution models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A result row rendered as JSON, keys in column order.
pub type JsonRow = Map<String, JsonValue>;

/// Column metadata from query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// PostgreSQL type OID
    #[serde(rename = "type")]
    pub type_oid: u32,
    /// Human-readable type name
    pub type_name: String,
}

impl ColumnInfo {
    /// Build from a driver column descriptor.
    pub fn from_column(col: &tokio_postgres::Column) -> Self {
        Self {
            name: col.name().to_string(),
            type_oid: col.type_().oid(),
            type_name: col.type_().name().to_string(),
        }
    }
}

/// Results from an ad-hoc statement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Rows returned, or rows affected for statements without a result set
    pub row_count: u64,
    /// Result rows
    pub rows: Vec<JsonRow>,
    /// Column metadata
    pub fields: Vec<ColumnInfo>,
}
