//! Backend services for DevLog.
//!
//! - `connection` - Database connection pooling with deadpool-postgres
//! - `log_ring` - Bounded in-memory log of operational events
//! - `query` - Ad-hoc statement execution
//! - `schema` - Table listing and paginated reads
//! - `transfer` - Migrate, merge and verify between environments

pub mod connection;
pub mod log_ring;
pub mod query;
pub mod schema;
pub mod transfer;

pub use connection::{ConnectionPool, PooledConnection};
pub use log_ring::LogRing;
pub use query::QueryService;
pub use schema::SchemaService;
pub use transfer::TransferService;
