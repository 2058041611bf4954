//! Data models for DevLog.
//!
//! - `environment` - Environment, ConnectionStatus, PoolStatus, EnvironmentStatus
//! - `log` - LogEntry, LogLevel, LogPage
//! - `query` - QueryResult, ColumnInfo
//! - `schema` - TablePage, PageRequest
//! - `render` - JSON rendering of binary column values
//! - `transfer` - migrate/merge/verify reports
//! - `value` - SqlValue, RowSet

pub mod environment;
pub mod log;
pub mod query;
pub mod render;
pub mod schema;
pub mod transfer;
pub mod value;

pub use environment::{ConnectionStatus, DbInfo, Environment, EnvironmentStatus, PoolStatus};
pub use log::{LevelFilter, LogEntry, LogLevel, LogPage};
pub use query::{ColumnInfo, JsonRow, QueryResult};
pub use schema::{PageRequest, TablePage};
pub use transfer::{
    MergeReport, MigrateReport, TransferResult, TransferStatus, VerifyReport, VerifyStatus,
};
pub use value::{base_type, RowSet, SqlValue};
