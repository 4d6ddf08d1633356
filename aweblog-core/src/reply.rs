use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

/// A cookie assignment attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub max_age: u64,
    pub http_only: bool,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, max_age: u64) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age,
            http_only: true,
        }
    }

    /// A deletion marker: overwrites the cookie and expires it immediately.
    pub fn clear(name: impl Into<String>) -> Self {
        Self::new(name, "-deleted-", 0)
    }

    pub fn header_value(&self) -> String {
        let mut out = format!(
            "{}={}; Max-Age={}; Path=/",
            self.name, self.value, self.max_age
        );
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

/// Body of a reply: a structured JSON value, or a raw redirect instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    Json(Value),
    Redirect(String),
}

/// What a handler produces on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    body: ReplyBody,
    cookies: Vec<SetCookie>,
}

impl Reply {
    pub fn json(value: Value) -> Self {
        Self {
            body: ReplyBody::Json(value),
            cookies: Vec::new(),
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            body: ReplyBody::Redirect(location.into()),
            cookies: Vec::new(),
        }
    }

    pub fn with_cookie(mut self, cookie: SetCookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn body(&self) -> &ReplyBody {
        &self.body
    }

    pub fn cookies(&self) -> &[SetCookie] {
        &self.cookies
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            ReplyBody::Json(value) => Json(value).into_response(),
            ReplyBody::Redirect(location) => {
                let mut response = StatusCode::FOUND.into_response();
                if let Ok(value) = location.parse() {
                    response.headers_mut().insert(LOCATION, value);
                }
                response
            }
        };
        for cookie in &self.cookies {
            if let Ok(value) = cookie.header_value().parse() {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }
        response
    }
}
