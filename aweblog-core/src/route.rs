use crate::error::HandlerError;
use crate::reply::Reply;
use crate::request::Request;
use crate::signature::{HandlerShape, ParamKind, ParamSpec, SignatureError};
use axum::http::Method;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Call arguments assembled by the binder for one handler invocation: the
/// named argument mapping plus the optional request passthrough.
#[derive(Debug, Default)]
pub struct Args {
    values: Map<String, Value>,
    request: Option<Request>,
}

impl Args {
    pub fn new(values: Map<String, Value>, request: Option<Request>) -> Self {
        Self { values, request }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String-typed argument, if present.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// The live request, present when the handler declared a request
    /// parameter.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply, HandlerError>> + Send>>;
pub type HandlerFn = Arc<dyn Fn(Args) -> HandlerFuture + Send + Sync>;

/// One registered URL handler together with its analyzed parameter shape.
///
/// The shape is computed once by [`RouteBuilder::build`] and never
/// recomputed per request.
#[derive(Clone)]
pub struct Route {
    method: Method,
    path: String,
    name: String,
    shape: HandlerShape,
    handler: HandlerFn,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

impl Route {
    pub fn get<H, Fut>(path: &str, name: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
    {
        RouteBuilder::new(Method::GET, path, name, handler)
    }

    pub fn post<H, Fut>(path: &str, name: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
    {
        RouteBuilder::new(Method::POST, path, name, handler)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &HandlerShape {
        &self.shape
    }

    pub fn handler(&self) -> &HandlerFn {
        &self.handler
    }
}

/// Collects a handler's declared parameters, then analyzes them into a
/// [`Route`].
pub struct RouteBuilder {
    method: Method,
    path: String,
    name: String,
    params: Vec<ParamSpec>,
    handler: HandlerFn,
}

impl RouteBuilder {
    fn new<H, Fut>(method: Method, path: &str, name: &str, handler: H) -> Self
    where
        H: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
    {
        Self {
            method,
            path: path.to_string(),
            name: name.to_string(),
            params: Vec::new(),
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// A parameter fed by name from the matched path.
    pub fn positional(mut self, name: &'static str) -> Self {
        self.params.push(ParamSpec::new(name, ParamKind::Positional));
        self
    }

    /// A keyword-only parameter that must be supplied.
    pub fn required(mut self, name: &'static str) -> Self {
        self.params.push(ParamSpec::new(name, ParamKind::Required));
        self
    }

    /// A keyword-only parameter with a default injected when absent.
    pub fn optional(mut self, name: &'static str, default: Value) -> Self {
        self.params
            .push(ParamSpec::new(name, ParamKind::Optional(default)));
        self
    }

    /// A catchall absorbing any remaining named arguments.
    pub fn catch_all(mut self, name: &'static str) -> Self {
        self.params.push(ParamSpec::new(name, ParamKind::CatchAll));
        self
    }

    /// The request passthrough parameter.
    pub fn request(mut self, name: &'static str) -> Self {
        self.params.push(ParamSpec::new(name, ParamKind::Request));
        self
    }

    /// Analyze the declared parameters and finish the registration.
    pub fn build(self) -> Result<Route, SignatureError> {
        let shape = HandlerShape::analyze(&self.name, &self.params)?;
        tracing::info!(
            method = %self.method,
            path = %self.path,
            handler = %self.name,
            "registered route"
        );
        Ok(Route {
            method: self.method,
            path: self.path,
            name: self.name,
            shape,
            handler: self.handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn ok_handler(_args: Args) -> Result<Reply, HandlerError> {
        Ok(Reply::json(json!({"ok": true})))
    }

    #[test]
    fn build_analyzes_once_and_stores_shape() {
        let route = Route::post("/api/users", "api_register_user", ok_handler)
            .required("email")
            .required("name")
            .optional("image", json!("about:blank"))
            .build()
            .unwrap();
        assert_eq!(route.method(), &Method::POST);
        assert_eq!(route.shape().required(), ["email", "name"]);
        assert_eq!(route.shape().named(), ["email", "name", "image"]);
    }

    #[test]
    fn invalid_declaration_fails_at_registration() {
        let err = Route::get("/x", "broken", ok_handler)
            .request("request")
            .positional("id")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
