use crate::error::DataError;
use crate::executor::Db;
use crate::schema::{quote_ident, Schema};
use crate::value::{Row, SqlValue};

/// Column alias used by [`Model::find_number`] for the aggregate value.
pub const NUMBER_ALIAS: &str = "_num_";

/// Row cap for a select: a plain count, or an offset/count pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(u64),
    OffsetCount(u64, u64),
}

/// Optional clauses composed onto an entity's select template.
///
/// # Example
///
/// ```ignore
/// let recent = Blog::find_all(
///     &db,
///     Query::new()
///         .order_by("created_at desc")
///         .limit(Limit::OffsetCount(page.offset, page.limit)),
/// )
/// .await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    filter: Option<String>,
    args: Vec<SqlValue>,
    order_by: Option<String>,
    limit: Option<Limit>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `where` clause with its placeholder arguments.
    pub fn filter(mut self, clause: impl Into<String>, args: Vec<SqlValue>) -> Self {
        self.filter = Some(clause.into());
        self.args = args;
        self
    }

    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by = Some(clause.into());
        self
    }

    pub fn limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// An entity type mapped to one relational table.
///
/// Implementations supply the compiled [`Schema`] and a table-driven
/// field get/set; the generic CRUD operations are provided on top of any
/// [`crate::Executor`]. Implemented manually per entity.
#[async_trait::async_trait]
pub trait Model: Sized + Send + Sync + 'static {
    /// Compiled schema for this entity type.
    fn schema() -> &'static Schema;

    /// Value currently set on the instance, by field name.
    fn get(&self, field: &str) -> Option<SqlValue>;

    /// Write a value onto the instance, by field name. Unknown names are
    /// ignored.
    fn set(&mut self, field: &str, value: SqlValue);

    /// Materialize a fresh instance from a result row.
    fn from_row(row: &Row) -> Result<Self, DataError>;

    /// Value of `field`, falling back to the schema default when unset.
    ///
    /// An explicitly set value always wins. Defaults resolve lazily and the
    /// resolved value is written back onto the instance, so repeated reads
    /// within the instance's lifetime stay consistent.
    fn value_or_default(&mut self, field: &str) -> SqlValue {
        if let Some(value) = self.get(field) {
            return value;
        }
        match Self::schema().field(field).and_then(|f| f.resolve_default()) {
            Some(value) => {
                tracing::debug!(field, "using default value");
                self.set(field, value.clone());
                value
            }
            None => SqlValue::Null,
        }
    }

    /// Look up one instance by primary key; `None` when no row matches.
    async fn find(db: &Db, pk: SqlValue) -> Result<Option<Self>, DataError> {
        let schema = Self::schema();
        let sql = format!(
            "{} where {} = ?",
            schema.select(),
            quote_ident(schema.primary_key())
        );
        let rows = db.query(&sql, &[pk], Some(1)).await?;
        match rows.first() {
            Some(row) => Ok(Some(Self::from_row(row)?)),
            None => Ok(None),
        }
    }

    /// All instances matching `query`, each row materialized fresh.
    async fn find_all(db: &Db, query: Query) -> Result<Vec<Self>, DataError> {
        let schema = Self::schema();
        let Query {
            filter,
            mut args,
            order_by,
            limit,
        } = query;
        let mut sql = schema.select().to_string();
        if let Some(filter) = filter {
            sql.push_str(" where ");
            sql.push_str(&filter);
        }
        if let Some(order_by) = order_by {
            sql.push_str(" order by ");
            sql.push_str(&order_by);
        }
        match limit {
            Some(Limit::Count(count)) => {
                sql.push_str(" limit ?");
                args.push(SqlValue::Int(count as i64));
            }
            Some(Limit::OffsetCount(offset, count)) => {
                sql.push_str(" limit ?, ?");
                args.push(SqlValue::Int(offset as i64));
                args.push(SqlValue::Int(count as i64));
            }
            None => {}
        }
        let rows = db.query(&sql, &args, None).await?;
        rows.iter().map(Self::from_row).collect()
    }

    /// Single aggregate value (`select <expr> as _num_ from ...`), or
    /// `None` when the result set is empty.
    async fn find_number(
        db: &Db,
        select_field: &str,
        filter: Option<&str>,
        args: &[SqlValue],
    ) -> Result<Option<SqlValue>, DataError> {
        let schema = Self::schema();
        let mut sql = format!(
            "select {select_field} as {NUMBER_ALIAS} from {}",
            quote_ident(schema.table())
        );
        if let Some(filter) = filter {
            sql.push_str(" where ");
            sql.push_str(filter);
        }
        let rows = db.query(&sql, args, Some(1)).await?;
        Ok(rows.first().and_then(|row| row.get(NUMBER_ALIAS)).cloned())
    }

    /// Insert the instance, resolving defaults for unset non-key fields.
    ///
    /// One affected row is expected; a mismatch is logged and surfaced in
    /// the returned count, never raised.
    async fn save(&mut self, db: &Db) -> Result<u64, DataError> {
        let schema = Self::schema();
        let mut args = Vec::with_capacity(schema.non_key_fields().len() + 1);
        for field in schema.non_key_fields() {
            args.push(self.value_or_default(field));
        }
        args.push(self.value_or_default(schema.primary_key()));
        let affected = db.execute(schema.insert(), &args, false).await?;
        if affected != 1 {
            tracing::warn!(table = schema.table(), affected, "insert affected rows != 1");
        }
        Ok(affected)
    }

    /// Write all non-key fields back, filtered by primary key. Existing
    /// instances are assumed fully populated; no defaulting happens here.
    async fn update(&self, db: &Db) -> Result<u64, DataError> {
        let schema = Self::schema();
        let mut args = Vec::with_capacity(schema.non_key_fields().len() + 1);
        for field in schema.non_key_fields() {
            args.push(self.get(field).unwrap_or(SqlValue::Null));
        }
        args.push(self.get(schema.primary_key()).unwrap_or(SqlValue::Null));
        let affected = db.execute(schema.update(), &args, false).await?;
        if affected != 1 {
            tracing::warn!(table = schema.table(), affected, "update affected rows != 1");
        }
        Ok(affected)
    }

    /// Delete the row with this instance's primary key.
    async fn remove(&self, db: &Db) -> Result<u64, DataError> {
        let schema = Self::schema();
        let args = [self.get(schema.primary_key()).unwrap_or(SqlValue::Null)];
        let affected = db.execute(schema.delete(), &args, false).await?;
        if affected != 1 {
            tracing::warn!(table = schema.table(), affected, "delete affected rows != 1");
        }
        Ok(affected)
    }
}
