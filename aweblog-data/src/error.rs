/// Errors surfaced by the data layer.
#[derive(Debug)]
pub enum DataError {
    /// Driver-level failure: connectivity, SQL errors, constraint
    /// violations.
    Database(Box<dyn std::error::Error + Send + Sync>),
    /// A result row could not be decoded into the expected shape.
    Decode(String),
    /// The pool or endpoint configuration was rejected.
    Config(String),
}

impl DataError {
    /// Wrap a driver-specific error into the `Database` variant.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Database(err) => write!(f, "database error: {err}"),
            DataError::Decode(msg) => write!(f, "row decode error: {msg}"),
            DataError::Config(msg) => write!(f, "database config error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<DataError> for aweblog_core::HttpError {
    fn from(err: DataError) -> Self {
        aweblog_core::HttpError::Internal(err.to_string())
    }
}

impl From<DataError> for aweblog_core::HandlerError {
    fn from(err: DataError) -> Self {
        aweblog_core::HandlerError::Http(err.into())
    }
}
