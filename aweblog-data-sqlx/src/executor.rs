use aweblog_data::{DataError, DbConfig, Executor, Row, SqlValue};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

/// MySQL-backed [`Executor`] over a bounded sqlx connection pool.
///
/// Checkout and release are scoped inside each call: sqlx returns the
/// connection to the pool when the acquired handle drops, on success and
/// error paths alike.
pub struct SqlxExecutor {
    pool: MySqlPool,
}

impl SqlxExecutor {
    /// Establish the bounded pool described by `config`.
    pub async fn connect(config: &DbConfig) -> Result<Self, DataError> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .charset(&config.charset);
        let mut pool_options = MySqlPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections);
        if !config.autocommit {
            pool_options = pool_options.after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("set autocommit = 0").execute(&mut *conn).await?;
                    Ok(())
                })
            });
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(DataError::database)?;
        tracing::info!(
            host = %config.host,
            database = %config.database,
            max_connections = config.max_connections,
            "created database connection pool"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

/// Bind positional arguments onto a prepared query.
///
/// The public placeholder convention is `?`, which is already MySQL's
/// native marker; other backends would rewrite the statement here.
fn bind<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    args: &'q [SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    for arg in args {
        query = match arg {
            SqlValue::Null => query.bind(Option::<String>::None),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

/// Decode one driver row into the ordered column/value mapping.
fn decode_row(row: &MySqlRow) -> Result<Row, DataError> {
    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index).map_err(DataError::database)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match column.type_info().name() {
                "BOOLEAN" => SqlValue::Bool(row.try_get(index).map_err(DataError::database)?),
                "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                    SqlValue::Int(row.try_get(index).map_err(DataError::database)?)
                }
                "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED"
                | "INT UNSIGNED" | "BIGINT UNSIGNED" => {
                    let unsigned: u64 = row.try_get(index).map_err(DataError::database)?;
                    SqlValue::Int(unsigned as i64)
                }
                "FLOAT" => {
                    let single: f32 = row.try_get(index).map_err(DataError::database)?;
                    SqlValue::Float(f64::from(single))
                }
                "DOUBLE" => SqlValue::Float(row.try_get(index).map_err(DataError::database)?),
                name => {
                    let text: String = row.try_get(index).map_err(|err| {
                        DataError::Decode(format!(
                            "column '{}' of type {name}: {err}",
                            column.name()
                        ))
                    })?;
                    SqlValue::Text(text)
                }
            }
        };
        out.push(column.name().to_string(), value);
    }
    Ok(out)
}

#[async_trait]
impl Executor for SqlxExecutor {
    async fn query(
        &self,
        sql: &str,
        args: &[SqlValue],
        limit: Option<usize>,
    ) -> Result<Vec<Row>, DataError> {
        tracing::debug!(sql, "query");
        let cap = limit.unwrap_or(usize::MAX);
        let mut rows = Vec::new();
        let mut stream = bind(sqlx::query(sql), args).fetch(&self.pool);
        while rows.len() < cap {
            match stream.try_next().await.map_err(DataError::database)? {
                Some(row) => rows.push(decode_row(&row)?),
                None => break,
            }
        }
        tracing::debug!(rows = rows.len(), "rows returned");
        Ok(rows)
    }

    async fn execute(
        &self,
        sql: &str,
        args: &[SqlValue],
        transactional: bool,
    ) -> Result<u64, DataError> {
        tracing::debug!(sql, transactional, "execute");
        if transactional {
            let mut tx = self.pool.begin().await.map_err(DataError::database)?;
            match bind(sqlx::query(sql), args).execute(&mut *tx).await {
                Ok(done) => {
                    tx.commit().await.map_err(DataError::database)?;
                    Ok(done.rows_affected())
                }
                Err(err) => {
                    if let Err(rollback) = tx.rollback().await {
                        tracing::warn!(error = %rollback, "rollback failed");
                    }
                    Err(DataError::database(err))
                }
            }
        } else {
            let done = bind(sqlx::query(sql), args)
                .execute(&self.pool)
                .await
                .map_err(DataError::database)?;
            Ok(done.rows_affected())
        }
    }
}
