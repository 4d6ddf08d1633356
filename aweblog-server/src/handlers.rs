use crate::auth;
use crate::config::SessionConfig;
use crate::models::{next_id, Blog, Comment, User};
use aweblog_core::prelude::*;
use aweblog_core::SignatureError;
use aweblog_data::{Db, Limit, Model, Page, Query, SqlValue};
use md5::{Digest, Md5};
use regex::Regex;
use serde_json::json;
use std::future::Future;
use std::sync::{Arc, LazyLock};

static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9.\-_]+@[a-z0-9\-_]+(\.[a-z0-9\-_]+){1,4}$").unwrap()
});
static RE_SHA1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-f]{40}$").unwrap());

/// Everything handlers need, passed down instead of living in globals.
pub struct AppContext {
    pub db: Db,
    pub session: SessionConfig,
}

/// Adapt a `(ctx, args)` handler into the registry's `(args)` shape.
fn with_ctx<F, Fut>(ctx: Arc<AppContext>, f: F) -> impl Fn(Args) -> Fut + Send + Sync + 'static
where
    F: Fn(Arc<AppContext>, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
{
    move |args| f(ctx.clone(), args)
}

/// Register every API route, analyzing each handler's parameter shape
/// once. A rejected declaration aborts startup.
pub fn routes(ctx: Arc<AppContext>) -> Result<Vec<Route>, SignatureError> {
    Ok(vec![
        Route::post(
            "/api/authenticate",
            "authenticate",
            with_ctx(ctx.clone(), authenticate),
        )
        .required("email")
        .required("passwd")
        .build()?,
        Route::get("/signout", "signout", with_ctx(ctx.clone(), signout))
            .request("request")
            .build()?,
        Route::post(
            "/api/users",
            "api_register_user",
            with_ctx(ctx.clone(), api_register_user),
        )
        .required("email")
        .required("name")
        .required("passwd")
        .build()?,
        Route::get(
            "/api/users",
            "api_get_users",
            with_ctx(ctx.clone(), api_get_users),
        )
        .optional("page", json!("1"))
        .build()?,
        Route::get("/api/blogs", "api_blogs", with_ctx(ctx.clone(), api_blogs))
            .optional("page", json!("1"))
            .build()?,
        Route::get(
            "/api/blogs/{id}",
            "api_get_blog",
            with_ctx(ctx.clone(), api_get_blog),
        )
        .positional("id")
        .build()?,
        Route::post(
            "/api/blogs",
            "api_create_blog",
            with_ctx(ctx.clone(), api_create_blog),
        )
        .request("request")
        .required("name")
        .required("summary")
        .required("content")
        .build()?,
        Route::post(
            "/api/blogs/{id}/delete",
            "api_delete_blog",
            with_ctx(ctx.clone(), api_delete_blog),
        )
        .positional("id")
        .request("request")
        .build()?,
        Route::post(
            "/api/blogs/{id}/comments",
            "api_create_comment",
            with_ctx(ctx.clone(), api_create_comment),
        )
        .positional("id")
        .request("request")
        .required("content")
        .build()?,
        Route::post(
            "/api/comments/{id}/delete",
            "api_delete_comment",
            with_ctx(ctx, api_delete_comment),
        )
        .positional("id")
        .request("request")
        .build()?,
    ])
}

/// Requested 1-based page number; anything unusable falls back to 1.
fn get_page_index(page: Option<&str>) -> u64 {
    page.and_then(|p| p.parse().ok()).filter(|p| *p >= 1).unwrap_or(1)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Reply, HandlerError> {
    let value = serde_json::to_value(value)
        .map_err(|err| HttpError::Internal(format!("response serialization: {err}")))?;
    Ok(Reply::json(value))
}

/// Session user, or the sign-in nudge.
async fn require_user(ctx: &AppContext, args: &Args) -> Result<User, HandlerError> {
    let request = args
        .request()
        .ok_or_else(|| HttpError::Internal("handler registered without request passthrough".to_string()))?;
    auth::current_user(&ctx.db, request, &ctx.session.secret)
        .await
        .ok_or_else(|| ApiError::forbidden("Please signin first.").into())
}

async fn check_admin(ctx: &AppContext, args: &Args) -> Result<User, HandlerError> {
    let user = require_user(ctx, args).await?;
    if user.admin != Some(true) {
        return Err(ApiError::forbidden("Admin required.").into());
    }
    Ok(user)
}

async fn authenticate(ctx: Arc<AppContext>, args: Args) -> Result<Reply, HandlerError> {
    let email = args.string("email").unwrap_or_default().to_string();
    let passwd = args.string("passwd").unwrap_or_default().to_string();
    if email.is_empty() {
        return Err(ApiError::value_invalid("email", "Invalid email.").into());
    }
    if passwd.is_empty() {
        return Err(ApiError::value_invalid("passwd", "Invalid passwd.").into());
    }
    let users = User::find_all(
        &ctx.db,
        Query::new().filter("`email` = ?", vec![SqlValue::Text(email)]),
    )
    .await?;
    let Some(mut user) = users.into_iter().next() else {
        return Err(ApiError::value_invalid("email", "Email not exist.").into());
    };
    let uid = user.id.clone().unwrap_or_default();
    if user.passwd.as_deref() != Some(auth::password_digest(&uid, &passwd).as_str()) {
        return Err(ApiError::value_invalid("passwd", "Invalid password.").into());
    }
    let cookie = auth::user_to_cookie(&user, ctx.session.max_age, &ctx.session.secret)
        .ok_or_else(|| HttpError::Internal("user record missing credentials".to_string()))?;
    user.passwd = Some(auth::MASKED_PASSWD.to_string());
    Ok(to_json(&user)?
        .with_cookie(SetCookie::new(auth::COOKIE_NAME, cookie, ctx.session.max_age)))
}

async fn signout(_ctx: Arc<AppContext>, args: Args) -> Result<Reply, HandlerError> {
    let referer = args
        .request()
        .and_then(|r| r.header("referer"))
        .unwrap_or("/")
        .to_string();
    tracing::info!("user signed out");
    Ok(Reply::redirect(referer).with_cookie(SetCookie::clear(auth::COOKIE_NAME)))
}

async fn api_register_user(ctx: Arc<AppContext>, args: Args) -> Result<Reply, HandlerError> {
    let name = args.string("name").unwrap_or_default().trim().to_string();
    let email = args.string("email").unwrap_or_default().to_string();
    let passwd = args.string("passwd").unwrap_or_default().to_string();
    if name.is_empty() {
        return Err(ApiError::value_invalid("name", "").into());
    }
    if !RE_EMAIL.is_match(&email) {
        return Err(ApiError::value_invalid("email", "").into());
    }
    if !RE_SHA1.is_match(&passwd) {
        return Err(ApiError::value_invalid("passwd", "").into());
    }
    let existing = User::find_all(
        &ctx.db,
        Query::new().filter("`email` = ?", vec![SqlValue::Text(email.clone())]),
    )
    .await?;
    if !existing.is_empty() {
        return Err(ApiError::new("register:failed", "email", "Email is already in use.").into());
    }
    let uid = next_id();
    let image = format!(
        "http://www.gravatar.com/avatar/{}?d=mm&s=120",
        hex::encode(Md5::digest(email.as_bytes()))
    );
    let mut user = User {
        id: Some(uid.clone()),
        email: Some(email),
        passwd: Some(auth::password_digest(&uid, &passwd)),
        name: Some(name),
        image: Some(image),
        ..User::default()
    };
    user.save(&ctx.db).await?;
    let cookie = auth::user_to_cookie(&user, ctx.session.max_age, &ctx.session.secret)
        .ok_or_else(|| HttpError::Internal("user record missing credentials".to_string()))?;
    user.passwd = Some(auth::MASKED_PASSWD.to_string());
    Ok(to_json(&user)?
        .with_cookie(SetCookie::new(auth::COOKIE_NAME, cookie, ctx.session.max_age)))
}

async fn api_get_users(ctx: Arc<AppContext>, args: Args) -> Result<Reply, HandlerError> {
    let page_index = get_page_index(args.string("page"));
    let count = User::find_number(&ctx.db, "count(`id`)", None, &[])
        .await?
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
        .max(0) as u64;
    let page = Page::new(count, page_index);
    let mut users = if count == 0 {
        Vec::new()
    } else {
        User::find_all(
            &ctx.db,
            Query::new()
                .order_by("`created_at` desc")
                .limit(Limit::OffsetCount(page.offset, page.limit)),
        )
        .await?
    };
    for user in &mut users {
        user.passwd = Some(auth::MASKED_PASSWD.to_string());
    }
    Ok(Reply::json(json!({ "page": page, "users": users })))
}

async fn api_blogs(ctx: Arc<AppContext>, args: Args) -> Result<Reply, HandlerError> {
    let page_index = get_page_index(args.string("page"));
    let count = Blog::find_number(&ctx.db, "count(`id`)", None, &[])
        .await?
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
        .max(0) as u64;
    let page = Page::new(count, page_index);
    let blogs = if count == 0 {
        Vec::new()
    } else {
        Blog::find_all(
            &ctx.db,
            Query::new()
                .order_by("`created_at` desc")
                .limit(Limit::OffsetCount(page.offset, page.limit)),
        )
        .await?
    };
    Ok(Reply::json(json!({ "page": page, "blogs": blogs })))
}

async fn api_get_blog(ctx: Arc<AppContext>, args: Args) -> Result<Reply, HandlerError> {
    let id = args.string("id").unwrap_or_default();
    match Blog::find(&ctx.db, SqlValue::Text(id.to_string())).await? {
        Some(blog) => to_json(&blog),
        None => Err(ApiError::not_found("blog", "Blog not exist.").into()),
    }
}

async fn api_create_blog(ctx: Arc<AppContext>, args: Args) -> Result<Reply, HandlerError> {
    let user = check_admin(&ctx, &args).await?;
    let name = args.string("name").unwrap_or_default().trim().to_string();
    let summary = args.string("summary").unwrap_or_default().trim().to_string();
    let content = args.string("content").unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return Err(ApiError::value_invalid("name", "name cannot be empty.").into());
    }
    if summary.is_empty() {
        return Err(ApiError::value_invalid("summary", "summary cannot be empty.").into());
    }
    if content.is_empty() {
        return Err(ApiError::value_invalid("content", "content cannot be empty.").into());
    }
    let mut blog = Blog {
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        user_image: user.image.clone(),
        name: Some(name),
        summary: Some(summary),
        content: Some(content),
        ..Blog::default()
    };
    blog.save(&ctx.db).await?;
    to_json(&blog)
}

async fn api_delete_blog(ctx: Arc<AppContext>, args: Args) -> Result<Reply, HandlerError> {
    check_admin(&ctx, &args).await?;
    let id = args.string("id").unwrap_or_default().to_string();
    let Some(blog) = Blog::find(&ctx.db, SqlValue::Text(id.clone())).await? else {
        return Err(ApiError::not_found("blog", "Blog not exist.").into());
    };
    blog.remove(&ctx.db).await?;
    // comments go with their blog
    ctx.db
        .execute(
            "delete from `comments` where `blog_id` = ?",
            &[SqlValue::Text(id.clone())],
            true,
        )
        .await
        .map_err(HandlerError::from)?;
    Ok(Reply::json(json!({ "id": id })))
}

async fn api_create_comment(ctx: Arc<AppContext>, args: Args) -> Result<Reply, HandlerError> {
    let user = require_user(&ctx, &args).await?;
    let content = args.string("content").unwrap_or_default().trim().to_string();
    if content.is_empty() {
        return Err(ApiError::value_invalid("content", "content cannot be empty.").into());
    }
    let id = args.string("id").unwrap_or_default();
    let Some(blog) = Blog::find(&ctx.db, SqlValue::Text(id.to_string())).await? else {
        return Err(ApiError::not_found("blog", "Blog not exist.").into());
    };
    let mut comment = Comment {
        blog_id: blog.id.clone(),
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        user_image: user.image.clone(),
        content: Some(content),
        ..Comment::default()
    };
    comment.save(&ctx.db).await?;
    to_json(&comment)
}

async fn api_delete_comment(ctx: Arc<AppContext>, args: Args) -> Result<Reply, HandlerError> {
    check_admin(&ctx, &args).await?;
    let id = args.string("id").unwrap_or_default().to_string();
    let Some(comment) = Comment::find(&ctx.db, SqlValue::Text(id.clone())).await? else {
        return Err(ApiError::not_found("comment", "Comment not exist.").into());
    };
    comment.remove(&ctx.db).await?;
    Ok(Reply::json(json!({ "id": id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password_digest;
    use crate::test_support::{Response, ScriptedDb};
    use aweblog_core::binder::dispatch;
    use aweblog_core::reply::ReplyBody;
    use aweblog_core::HttpError;
    use aweblog_data::Row;
    use axum::http::Method;
    use serde_json::Value;

    fn context(db: Arc<ScriptedDb>) -> Arc<AppContext> {
        Arc::new(AppContext {
            db,
            session: SessionConfig {
                secret: "test-secret".to_string(),
                max_age: 60,
            },
        })
    }

    fn route<'a>(routes: &'a [Route], name: &str) -> &'a Route {
        routes
            .iter()
            .find(|r| r.name() == name)
            .unwrap_or_else(|| panic!("no route named {name}"))
    }

    fn json_body(reply: &Reply) -> &Value {
        match reply.body() {
            ReplyBody::Json(value) => value,
            other => panic!("expected json reply, got {other:?}"),
        }
    }

    fn user_row(uid: &str, email: &str, passwd: &str, admin: bool) -> Row {
        Row::from_pairs(vec![
            ("id".to_string(), SqlValue::Text(uid.to_string())),
            ("email".to_string(), SqlValue::Text(email.to_string())),
            ("passwd".to_string(), SqlValue::Text(passwd.to_string())),
            ("admin".to_string(), SqlValue::Int(i64::from(admin))),
            ("name".to_string(), SqlValue::Text("Alice".to_string())),
            ("image".to_string(), SqlValue::Text("about:blank".to_string())),
            ("created_at".to_string(), SqlValue::Float(100.0)),
        ])
    }

    #[tokio::test]
    async fn authenticate_rejects_a_wrong_password() {
        let db = ScriptedDb::new(vec![Response::Rows(vec![user_row(
            "u1",
            "a@b.com",
            &password_digest("u1", "right"),
            false,
        )])]);
        let routes = routes(context(db)).unwrap();
        let request = Request::new(Method::POST, "/api/authenticate")
            .with_content_type("application/json")
            .with_body(r#"{"email":"a@b.com","passwd":"wrong"}"#);
        let reply = dispatch(route(&routes, "authenticate"), request)
            .await
            .unwrap();
        assert_eq!(json_body(&reply)["error"], "value:invalid");
        assert_eq!(json_body(&reply)["data"], "passwd");
    }

    #[tokio::test]
    async fn authenticate_sets_a_session_cookie_and_masks_passwd() {
        let passwd = "secret-token";
        let db = ScriptedDb::new(vec![Response::Rows(vec![user_row(
            "u1",
            "a@b.com",
            &password_digest("u1", passwd),
            false,
        )])]);
        let routes = routes(context(db)).unwrap();
        let request = Request::new(Method::POST, "/api/authenticate")
            .with_content_type("application/json")
            .with_body(format!(r#"{{"email":"a@b.com","passwd":"{passwd}"}}"#));
        let reply = dispatch(route(&routes, "authenticate"), request)
            .await
            .unwrap();
        assert_eq!(json_body(&reply)["passwd"], auth::MASKED_PASSWD);
        assert_eq!(reply.cookies().len(), 1);
        assert_eq!(reply.cookies()[0].name, auth::COOKIE_NAME);
        assert!(reply.cookies()[0].value.starts_with("u1-"));
    }

    #[tokio::test]
    async fn register_inserts_and_returns_a_masked_user() {
        let db = ScriptedDb::new(vec![
            Response::Rows(vec![]), // no user with that email yet
            Response::Affected(1),  // the insert
        ]);
        let scripted = db.clone();
        let routes = routes(context(db)).unwrap();
        let passwd = "a".repeat(40);
        let request = Request::new(Method::POST, "/api/users")
            .with_content_type("application/x-www-form-urlencoded")
            .with_body(format!("email=new%40b.com&name=Bob&passwd={passwd}"));
        let reply = dispatch(route(&routes, "api_register_user"), request)
            .await
            .unwrap();
        assert_eq!(json_body(&reply)["passwd"], auth::MASKED_PASSWD);
        assert_eq!(json_body(&reply)["email"], "new@b.com");
        assert_eq!(reply.cookies().len(), 1);

        let calls = scripted.calls();
        assert!(calls[1].0.starts_with("insert into `users`"));
        // insert args run non-key fields first, primary key last
        assert_eq!(calls[1].1.len(), 7);
        assert_eq!(calls[1].1[0], SqlValue::Text("new@b.com".to_string()));
        assert_eq!(calls[1].1[2], SqlValue::Bool(false));
    }

    #[tokio::test]
    async fn register_missing_email_is_rejected_before_the_handler() {
        let db = ScriptedDb::new(vec![]);
        let scripted = db.clone();
        let routes = routes(context(db)).unwrap();
        let request = Request::new(Method::POST, "/api/users")
            .with_content_type("application/json")
            .with_body(r#"{"name":"Bob","passwd":"x"}"#);
        let err = dispatch(route(&routes, "api_register_user"), request)
            .await
            .unwrap_err();
        match err {
            HttpError::BadRequest(msg) => assert!(msg.contains("email")),
            other => panic!("expected bad request, got {other}"),
        }
        // the handler never ran, so nothing hit the database
        assert!(scripted.calls().is_empty());
    }

    #[tokio::test]
    async fn api_blogs_pages_with_offset_and_count() {
        let count_row = Row::from_pairs(vec![(
            "_num_".to_string(),
            SqlValue::Int(91),
        )]);
        let db = ScriptedDb::new(vec![
            Response::Rows(vec![count_row]),
            Response::Rows(vec![]),
        ]);
        let scripted = db.clone();
        let routes = routes(context(db)).unwrap();
        let request = Request::new(Method::GET, "/api/blogs").with_query("page=10");
        let reply = dispatch(route(&routes, "api_blogs"), request).await.unwrap();
        let body = json_body(&reply);
        assert_eq!(body["page"]["page_count"], 10);
        assert_eq!(body["page"]["offset"], 90);

        let calls = scripted.calls();
        let (sql, args) = &calls[1];
        assert!(sql.ends_with("order by `created_at` desc limit ?, ?"));
        assert_eq!(args, &vec![SqlValue::Int(90), SqlValue::Int(10)]);
    }

    #[tokio::test]
    async fn api_get_users_empty_table_skips_the_listing_query() {
        let db = ScriptedDb::new(vec![Response::Rows(vec![])]);
        let scripted = db.clone();
        let routes = routes(context(db)).unwrap();
        let reply = dispatch(
            route(&routes, "api_get_users"),
            Request::new(Method::GET, "/api/users"),
        )
        .await
        .unwrap();
        let body = json_body(&reply);
        assert_eq!(body["users"], json!([]));
        assert_eq!(body["page"]["limit"], 0);
        assert_eq!(scripted.calls().len(), 1);
    }

    #[tokio::test]
    async fn api_create_blog_without_a_session_is_forbidden() {
        let db = ScriptedDb::new(vec![]);
        let routes = routes(context(db)).unwrap();
        let request = Request::new(Method::POST, "/api/blogs")
            .with_content_type("application/json")
            .with_body(r#"{"name":"n","summary":"s","content":"c"}"#);
        let reply = dispatch(route(&routes, "api_create_blog"), request)
            .await
            .unwrap();
        assert_eq!(json_body(&reply)["error"], "permission:forbidden");
    }

    #[tokio::test]
    async fn api_get_blog_missing_row_is_a_not_found_error() {
        let db = ScriptedDb::new(vec![Response::Rows(vec![])]);
        let routes = routes(context(db)).unwrap();
        let request =
            Request::new(Method::GET, "/api/blogs/b1").with_path_param("id", "b1");
        let reply = dispatch(route(&routes, "api_get_blog"), request)
            .await
            .unwrap();
        assert_eq!(json_body(&reply)["error"], "value:notfound");
        assert_eq!(json_body(&reply)["data"], "blog");
    }

    #[test]
    fn page_index_parsing_falls_back_to_one() {
        assert_eq!(get_page_index(Some("3")), 3);
        assert_eq!(get_page_index(Some("0")), 1);
        assert_eq!(get_page_index(Some("-2")), 1);
        assert_eq!(get_page_index(Some("abc")), 1);
        assert_eq!(get_page_index(None), 1);
    }
}
