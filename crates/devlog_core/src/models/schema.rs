//! Table browsing models.

use serde::Serialize;

use super::query::{ColumnInfo, JsonRow};

/// Default page size for table reads.
pub const DEFAULT_PAGE_LIMIT: i64 = 100;

/// A page of rows from one table.
#[derive(Debug, Clone, Serialize)]
pub struct TablePage {
    /// Table name as requested.
    pub table: String,
    /// Total rows in the table.
    pub total: i64,
    /// Requested offset.
    pub offset: i64,
    /// Requested limit.
    pub limit: i64,
    /// Rows on this page.
    pub rows: Vec<JsonRow>,
    /// Column metadata.
    pub columns: Vec<ColumnInfo>,
}

/// Pagination window for a table read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum rows to return.
    pub limit: i64,
    /// Rows to skip.
    pub offset: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { limit: DEFAULT_PAGE_LIMIT, offset: 0 }
    }
}

impl PageRequest {
    /// Build from optional query parameters, rejecting negative values.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self, String> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let offset = offset.unwrap_or(0);
        if limit < 0 {
            return Err("limit must not be negative".to_string());
        }
        if offset < 0 {
            return Err("offset must not be negative".to_string());
        }
        Ok(Self { limit, offset })
    }
}
