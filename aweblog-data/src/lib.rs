pub mod error;
pub mod executor;
pub mod field;
pub mod model;
pub mod page;
pub mod schema;
pub mod value;

pub use error::DataError;
pub use executor::{Db, DbConfig, Executor};
pub use field::{Field, FieldDefault, FieldKind};
pub use model::{Limit, Model, Query};
pub use page::Page;
pub use schema::{Schema, SchemaError};
pub use value::{Row, SqlValue};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        DataError, Db, DbConfig, Executor, Field, Limit, Model, Page, Query, Row, Schema, SqlValue,
    };
}
