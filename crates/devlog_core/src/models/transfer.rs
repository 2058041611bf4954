//! Transfer engine reports.

use serde::Serialize;

/// Outcome of one table within a bulk migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Rows copied
    Success,
    /// Source table empty, destination untouched
    Skipped,
    /// Migration of this table failed
    Error,
}

/// Per-table result of a bulk migration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    /// Table name
    pub table: String,
    /// Outcome
    pub status: TransferStatus,
    /// Rows copied (absent on error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    /// Failure message (present on error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransferResult {
    /// A table whose rows were copied.
    pub fn success(table: impl Into<String>, row_count: u64) -> Self {
        Self { table: table.into(), status: TransferStatus::Success, row_count: Some(row_count), error: None }
    }

    /// A table that was empty at the source.
    pub fn skipped(table: impl Into<String>) -> Self {
        Self { table: table.into(), status: TransferStatus::Skipped, row_count: Some(0), error: None }
    }

    /// A table whose migration failed.
    pub fn failed(table: impl Into<String>, error: impl Into<String>) -> Self {
        Self { table: table.into(), status: TransferStatus::Error, row_count: None, error: Some(error.into()) }
    }
}

/// Result of migrating a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrateReport {
    /// Table name
    pub table: String,
    /// Rows inserted into the destination
    pub row_count: u64,
    /// Whether the destination was truncated
    pub truncated: bool,
}

impl MigrateReport {
    /// Summary line for the dashboard.
    pub fn message(&self) -> String {
        if self.truncated {
            format!("migration succeeded, {} rows", self.row_count)
        } else {
            "table is empty, nothing to migrate".to_string()
        }
    }
}

/// Result of merging a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Table name
    pub table: String,
    /// Rows read from the source
    pub offline_count: u64,
    /// Destination rows before merging
    pub online_count_before: i64,
    /// Rows inserted
    pub merged_count: u64,
    /// Rows skipped on unique-key collision
    pub duplicate_count: u64,
    /// Destination rows after merging
    pub online_count_after: i64,
}

impl MergeReport {
    /// Summary line for the dashboard.
    pub fn message(&self) -> String {
        if self.offline_count == 0 {
            "table is empty, nothing to merge".to_string()
        } else {
            format!(
                "merge succeeded, {} rows merged, {} duplicates skipped",
                self.merged_count, self.duplicate_count
            )
        }
    }
}

/// Row-count comparison outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStatus {
    /// Counts are equal
    Success,
    /// Counts differ
    Mismatch,
}

/// Result of comparing row counts between environments.
///
/// Only counts are compared; equal counts do not imply equal content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    /// Table name
    pub table: String,
    /// Comparison outcome
    pub status: VerifyStatus,
    /// Source row count
    pub offline_rows: i64,
    /// Destination row count
    pub online_rows: i64,
    /// Whether the counts are equal
    #[serde(rename = "match")]
    pub matched: bool,
}

impl VerifyReport {
    /// Compare two counts.
    pub fn compare(table: impl Into<String>, offline_rows: i64, online_rows: i64) -> Self {
        let matched = offline_rows == online_rows;
        Self {
            table: table.into(),
            status: if matched { VerifyStatus::Success } else { VerifyStatus::Mismatch },
            offline_rows,
            online_rows,
            matched,
        }
    }
}
