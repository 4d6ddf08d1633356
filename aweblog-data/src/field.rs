use crate::value::SqlValue;

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    Float,
    Text,
}

/// Declared default for a field: absent, a plain value, or a zero-argument
/// producer invoked each time the default is needed.
#[derive(Debug, Clone)]
pub enum FieldDefault {
    None,
    Value(SqlValue),
    Producer(fn() -> SqlValue),
}

/// One column of an entity schema. Immutable once constructed.
///
/// # Example
///
/// ```ignore
/// Field::string("id").primary_key().default_fn(next_id)
/// ```
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    kind: FieldKind,
    primary_key: bool,
    default: FieldDefault,
}

impl Field {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            primary_key: false,
            default: FieldDefault::None,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn float(name: &'static str) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<SqlValue>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    pub fn default_fn(mut self, producer: fn() -> SqlValue) -> Self {
        self.default = FieldDefault::Producer(producer);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn default(&self) -> &FieldDefault {
        &self.default
    }

    /// Resolve the declared default, invoking the producer if the default
    /// is one.
    pub fn resolve_default(&self) -> Option<SqlValue> {
        match &self.default {
            FieldDefault::None => None,
            FieldDefault::Value(v) => Some(v.clone()),
            FieldDefault::Producer(f) => Some(f()),
        }
    }
}
