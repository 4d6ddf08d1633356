use aweblog_data::{DataError, Db, Executor, Row, SqlValue};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One scripted database response.
pub enum Response {
    Rows(Vec<Row>),
    Affected(u64),
}

/// Scripted in-memory executor: replays queued responses in order and
/// records every statement, so handler tests run without a database.
pub struct ScriptedDb {
    script: Mutex<VecDeque<Response>>,
    calls: Mutex<Vec<(String, Vec<SqlValue>)>>,
}

impl ScriptedDb {
    pub fn new(script: Vec<Response>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Single-statement script answering with `rows`.
    pub fn with_rows(rows: Vec<Row>) -> Db {
        Self::new(vec![Response::Rows(rows)])
    }

    pub fn calls(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, args: &[SqlValue]) {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), args.to_vec()));
    }

    fn next(&self, sql: &str) -> Result<Response, DataError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DataError::Config(format!("unscripted statement: {sql}")))
    }
}

#[async_trait::async_trait]
impl Executor for ScriptedDb {
    async fn query(
        &self,
        sql: &str,
        args: &[SqlValue],
        limit: Option<usize>,
    ) -> Result<Vec<Row>, DataError> {
        self.record(sql, args);
        match self.next(sql)? {
            Response::Rows(mut rows) => {
                if let Some(limit) = limit {
                    rows.truncate(limit);
                }
                Ok(rows)
            }
            Response::Affected(_) => Err(DataError::Config(format!(
                "query hit an execute script entry: {sql}"
            ))),
        }
    }

    async fn execute(
        &self,
        sql: &str,
        args: &[SqlValue],
        _transactional: bool,
    ) -> Result<u64, DataError> {
        self.record(sql, args);
        match self.next(sql)? {
            Response::Affected(count) => Ok(count),
            Response::Rows(_) => Err(DataError::Config(format!(
                "execute hit a query script entry: {sql}"
            ))),
        }
    }
}
