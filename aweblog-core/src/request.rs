use axum::http::header::COOKIE;
use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use std::collections::HashMap;

/// The binder's view of one incoming HTTP request: everything argument
/// assembly needs, already collected.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub query: Option<String>,
    pub path_params: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            content_type: None,
            query: None,
            path_params: HashMap::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    /// Whether the method carries its arguments in the body rather than the
    /// query string.
    pub fn is_body_method(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT || self.method == Method::PATCH
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Value of a cookie from the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.headers.get(COOKIE)?.to_str().ok()?;
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_lookup() {
        let req = Request::new(Method::GET, "/")
            .with_header("cookie", "a=1; awesession=u1-99-abc; b=2");
        assert_eq!(req.cookie("awesession").as_deref(), Some("u1-99-abc"));
        assert_eq!(req.cookie("missing"), None);
    }

    #[test]
    fn body_methods() {
        assert!(Request::new(Method::POST, "/").is_body_method());
        assert!(Request::new(Method::PUT, "/").is_body_method());
        assert!(!Request::new(Method::GET, "/").is_body_method());
        assert!(!Request::new(Method::DELETE, "/").is_body_method());
    }
}
