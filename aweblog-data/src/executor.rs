use crate::error::DataError;
use crate::value::{Row, SqlValue};
use serde::Deserialize;
use std::sync::Arc;

/// Database endpoint and pool configuration.
///
/// Deserializable from the application config file; every field has a
/// sensible default so a config only needs to name what it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub charset: String,
    /// When false, connections run with auto-commit disabled and rely on
    /// explicit transactions.
    pub autocommit: bool,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            charset: "utf8".to_string(),
            autocommit: true,
            min_connections: 1,
            max_connections: 10,
        }
    }
}

/// Shared handle to the process executor, passed down to everything that
/// touches the database.
pub type Db = Arc<dyn Executor>;

/// Pooled, transactional query execution.
///
/// SQL uses `?` as its placeholder convention; implementations translate to
/// the driver's native marker before sending. A checked-out connection is
/// owned exclusively by the caller for the duration of one call and is
/// returned to the pool on every exit path.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Run a statement that produces rows, returning up to `limit` of them
    /// (all rows when `limit` is `None`) as ordered column/value mappings.
    async fn query(
        &self,
        sql: &str,
        args: &[SqlValue],
        limit: Option<usize>,
    ) -> Result<Vec<Row>, DataError>;

    /// Run a statement that mutates rows, returning the affected count.
    ///
    /// With `transactional` set, a transaction is explicitly started and
    /// either committed on success or rolled back before the error
    /// propagates; otherwise the connection's auto-commit behavior applies.
    async fn execute(
        &self,
        sql: &str,
        args: &[SqlValue],
        transactional: bool,
    ) -> Result<u64, DataError>;
}
