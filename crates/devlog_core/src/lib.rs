//! Core types and services for the DevLog database console.
//!
//! This crate provides the backend service layer for DevLog:
//!
//! - **error**: Error handling with PostgreSQL-specific details
//! - **models**: Environments, log entries, query results and transfer reports
//! - **services**: Connection pooling, query execution, schema reads, transfers
//! - **state**: Application state shared by request handlers
//! - **config**: Layered configuration (defaults, TOML, environment)
//! - **logging**: Structured logging setup

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

pub use config::{load_config, DevlogConfig};
pub use error::{DevlogError, ErrorKind};
pub use models::{
    ColumnInfo, Environment, EnvironmentStatus, LevelFilter, LogEntry, LogLevel, LogPage,
    MergeReport, MigrateReport, PageRequest, QueryResult, TablePage, TransferResult, VerifyReport,
};
pub use services::{ConnectionPool, LogRing, QueryService, SchemaService, TransferService};
pub use state::DevlogState;
