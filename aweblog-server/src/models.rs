use aweblog_data::{DataError, Field, Model, Row, Schema, SqlValue};
use serde::Serialize;
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Seconds since the epoch as a float, the storage type of `created_at`.
pub fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Unique, roughly time-ordered 50-char id: millisecond timestamp plus a
/// random uuid, zero padded.
pub fn next_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{millis:015}{}000", Uuid::new_v4().simple())
}

fn id_default() -> SqlValue {
    SqlValue::Text(next_id())
}

fn created_at_default() -> SqlValue {
    SqlValue::Float(now())
}

static USER_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::compile(
        "users",
        vec![
            Field::string("id").primary_key().default_fn(id_default),
            Field::string("email"),
            Field::string("passwd"),
            Field::boolean("admin").default_value(false),
            Field::string("name"),
            Field::string("image"),
            Field::float("created_at").default_fn(created_at_default),
        ],
    )
    .expect("users schema")
});

/// A registered account.
#[derive(Debug, Clone, Default, Serialize)]
pub struct User {
    pub id: Option<String>,
    pub email: Option<String>,
    pub passwd: Option<String>,
    pub admin: Option<bool>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub created_at: Option<f64>,
}

impl Model for User {
    fn schema() -> &'static Schema {
        &USER_SCHEMA
    }

    fn get(&self, field: &str) -> Option<SqlValue> {
        match field {
            "id" => self.id.clone().map(SqlValue::Text),
            "email" => self.email.clone().map(SqlValue::Text),
            "passwd" => self.passwd.clone().map(SqlValue::Text),
            "admin" => self.admin.map(SqlValue::Bool),
            "name" => self.name.clone().map(SqlValue::Text),
            "image" => self.image.clone().map(SqlValue::Text),
            "created_at" => self.created_at.map(SqlValue::Float),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: SqlValue) {
        match field {
            "id" => self.id = value.as_str().map(str::to_string),
            "email" => self.email = value.as_str().map(str::to_string),
            "passwd" => self.passwd = value.as_str().map(str::to_string),
            "admin" => self.admin = value.as_bool(),
            "name" => self.name = value.as_str().map(str::to_string),
            "image" => self.image = value.as_str().map(str::to_string),
            "created_at" => self.created_at = value.as_f64(),
            _ => {}
        }
    }

    fn from_row(row: &Row) -> Result<Self, DataError> {
        let mut user = Self::default();
        for (name, value) in row.columns() {
            user.set(name, value.clone());
        }
        Ok(user)
    }
}

static BLOG_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::compile(
        "blogs",
        vec![
            Field::string("id").primary_key().default_fn(id_default),
            Field::string("user_id"),
            Field::string("user_name"),
            Field::string("user_image"),
            Field::string("name"),
            Field::string("summary"),
            Field::text("content"),
            Field::float("created_at").default_fn(created_at_default),
        ],
    )
    .expect("blogs schema")
});

/// One published post.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Blog {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub created_at: Option<f64>,
}

impl Model for Blog {
    fn schema() -> &'static Schema {
        &BLOG_SCHEMA
    }

    fn get(&self, field: &str) -> Option<SqlValue> {
        match field {
            "id" => self.id.clone().map(SqlValue::Text),
            "user_id" => self.user_id.clone().map(SqlValue::Text),
            "user_name" => self.user_name.clone().map(SqlValue::Text),
            "user_image" => self.user_image.clone().map(SqlValue::Text),
            "name" => self.name.clone().map(SqlValue::Text),
            "summary" => self.summary.clone().map(SqlValue::Text),
            "content" => self.content.clone().map(SqlValue::Text),
            "created_at" => self.created_at.map(SqlValue::Float),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: SqlValue) {
        match field {
            "id" => self.id = value.as_str().map(str::to_string),
            "user_id" => self.user_id = value.as_str().map(str::to_string),
            "user_name" => self.user_name = value.as_str().map(str::to_string),
            "user_image" => self.user_image = value.as_str().map(str::to_string),
            "name" => self.name = value.as_str().map(str::to_string),
            "summary" => self.summary = value.as_str().map(str::to_string),
            "content" => self.content = value.as_str().map(str::to_string),
            "created_at" => self.created_at = value.as_f64(),
            _ => {}
        }
    }

    fn from_row(row: &Row) -> Result<Self, DataError> {
        let mut blog = Self::default();
        for (name, value) in row.columns() {
            blog.set(name, value.clone());
        }
        Ok(blog)
    }
}

static COMMENT_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::compile(
        "comments",
        vec![
            Field::string("id").primary_key().default_fn(id_default),
            Field::string("blog_id"),
            Field::string("user_id"),
            Field::string("user_name"),
            Field::string("user_image"),
            Field::text("content"),
            Field::float("created_at").default_fn(created_at_default),
        ],
    )
    .expect("comments schema")
});

/// A comment under a blog post.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Comment {
    pub id: Option<String>,
    pub blog_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
    pub content: Option<String>,
    pub created_at: Option<f64>,
}

impl Model for Comment {
    fn schema() -> &'static Schema {
        &COMMENT_SCHEMA
    }

    fn get(&self, field: &str) -> Option<SqlValue> {
        match field {
            "id" => self.id.clone().map(SqlValue::Text),
            "blog_id" => self.blog_id.clone().map(SqlValue::Text),
            "user_id" => self.user_id.clone().map(SqlValue::Text),
            "user_name" => self.user_name.clone().map(SqlValue::Text),
            "user_image" => self.user_image.clone().map(SqlValue::Text),
            "content" => self.content.clone().map(SqlValue::Text),
            "created_at" => self.created_at.map(SqlValue::Float),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: SqlValue) {
        match field {
            "id" => self.id = value.as_str().map(str::to_string),
            "blog_id" => self.blog_id = value.as_str().map(str::to_string),
            "user_id" => self.user_id = value.as_str().map(str::to_string),
            "user_name" => self.user_name = value.as_str().map(str::to_string),
            "user_image" => self.user_image = value.as_str().map(str::to_string),
            "content" => self.content = value.as_str().map(str::to_string),
            "created_at" => self.created_at = value.as_f64(),
            _ => {}
        }
    }

    fn from_row(row: &Row) -> Result<Self, DataError> {
        let mut comment = Self::default();
        for (name, value) in row.columns() {
            comment.set(name, value.clone());
        }
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_id_is_unique_and_sized() {
        let a = next_id();
        let b = next_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 50);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn user_schema_templates() {
        let schema = User::schema();
        assert_eq!(schema.table(), "users");
        assert_eq!(schema.primary_key(), "id");
        assert_eq!(
            schema.select(),
            "select `id`, `email`, `passwd`, `admin`, `name`, `image`, `created_at` from `users`"
        );
        assert_eq!(
            schema.insert(),
            "insert into `users` (`email`, `passwd`, `admin`, `name`, `image`, `created_at`, `id`) \
             values (?, ?, ?, ?, ?, ?, ?)"
        );
    }

    #[test]
    fn table_driven_get_set_round_trip() {
        let mut blog = Blog::default();
        blog.set("name", SqlValue::Text("First post".into()));
        blog.set("created_at", SqlValue::Float(1.5));
        blog.set("unknown", SqlValue::Text("ignored".into()));
        assert_eq!(blog.get("name"), Some(SqlValue::Text("First post".into())));
        assert_eq!(blog.created_at, Some(1.5));
        assert_eq!(blog.get("unknown"), None);
    }

    #[test]
    fn admin_flag_survives_tinyint_rows() {
        let row = Row::from_pairs(vec![
            ("id".to_string(), SqlValue::Text("u1".into())),
            ("admin".to_string(), SqlValue::Int(1)),
        ]);
        let user = User::from_row(&row).unwrap();
        assert_eq!(user.admin, Some(true));
    }
}
