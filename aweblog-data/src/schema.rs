use crate::field::Field;

/// Quote an identifier so column and table names cannot collide with
/// reserved words.
pub fn quote_ident(ident: &str) -> String {
    format!("`{ident}`")
}

/// One `?` placeholder per argument, comma separated.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// A fatal configuration error in an entity declaration, surfaced when the
/// schema is compiled, before any instance exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    NoPrimaryKey { table: &'static str },
    DuplicatePrimaryKey {
        table: &'static str,
        field: &'static str,
    },
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::NoPrimaryKey { table } => {
                write!(f, "no primary key declared for table '{table}'")
            }
            SchemaError::DuplicatePrimaryKey { table, field } => {
                write!(f, "duplicate primary key '{field}' for table '{table}'")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Compiled metadata for one entity type: column mapping, primary key, and
/// the four SQL statement templates. Computed once per type and reused on
/// every operation.
#[derive(Debug, Clone)]
pub struct Schema {
    table: &'static str,
    primary_key: &'static str,
    non_key: Vec<&'static str>,
    fields: Vec<Field>,
    select: String,
    insert: String,
    update: String,
    delete: String,
}

impl Schema {
    /// Compile a declarative field list into a schema.
    ///
    /// Exactly one field must be marked primary key; zero or several is a
    /// configuration error reported here rather than at first use.
    pub fn compile(table: &'static str, fields: Vec<Field>) -> Result<Self, SchemaError> {
        let mut primary_key = None;
        let mut non_key = Vec::new();
        for field in &fields {
            if field.is_primary_key() {
                if primary_key.is_some() {
                    return Err(SchemaError::DuplicatePrimaryKey {
                        table,
                        field: field.name(),
                    });
                }
                primary_key = Some(field.name());
            } else {
                non_key.push(field.name());
            }
        }
        let primary_key = primary_key.ok_or(SchemaError::NoPrimaryKey { table })?;

        let escaped: Vec<String> = non_key.iter().map(|f| quote_ident(f)).collect();
        let column_list = escaped.join(", ");
        let set_list = escaped
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");

        let select = format!(
            "select {}, {} from {}",
            quote_ident(primary_key),
            column_list,
            quote_ident(table)
        );
        let insert = format!(
            "insert into {} ({}, {}) values ({})",
            quote_ident(table),
            column_list,
            quote_ident(primary_key),
            placeholders(non_key.len() + 1)
        );
        let update = format!(
            "update {} set {} where {} = ?",
            quote_ident(table),
            set_list,
            quote_ident(primary_key)
        );
        let delete = format!(
            "delete from {} where {} = ?",
            quote_ident(table),
            quote_ident(primary_key)
        );

        tracing::debug!(table, primary_key, "compiled entity schema");
        Ok(Self {
            table,
            primary_key,
            non_key,
            fields,
            select,
            insert,
            update,
            delete,
        })
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn primary_key(&self) -> &'static str {
        self.primary_key
    }

    /// Non-key field names in declaration order.
    pub fn non_key_fields(&self) -> &[&'static str] {
        &self.non_key
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Select template: primary key column first, then non-key columns in
    /// declaration order.
    pub fn select(&self) -> &str {
        &self.select
    }

    /// Insert template: non-key columns, then the primary key column last.
    /// Arguments must be supplied in exactly that order.
    pub fn insert(&self) -> &str {
        &self.insert
    }

    /// Update template: all non-key columns in declaration order, filtered
    /// by primary key.
    pub fn update(&self) -> &str {
        &self.update
    }

    /// Delete template, filtered by primary key.
    pub fn delete(&self) -> &str {
        &self.delete
    }
}
