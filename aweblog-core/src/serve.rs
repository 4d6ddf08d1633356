use crate::binder;
use crate::error::HttpError;
use crate::request::Request;
use crate::route::Route;
use axum::extract::RawPathParams;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;

/// Largest request body the adapter will collect.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Mount registered routes on an axum router.
///
/// Each route becomes one axum handler that collects the incoming request
/// into the binder's view and renders the binder's outcome back out.
pub fn into_router(routes: Vec<Route>) -> Router {
    let mut router = Router::new();
    for route in routes {
        let path = route.path().to_string();
        let method = route.method().clone();
        let route = Arc::new(route);
        let handler = move |params: RawPathParams, req: axum::extract::Request| {
            let route = route.clone();
            async move {
                match collect_request(params, req).await {
                    Ok(request) => match binder::dispatch(&route, request).await {
                        Ok(reply) => reply.into_response(),
                        Err(err) => err.into_response(),
                    },
                    Err(err) => err.into_response(),
                }
            }
        };
        let endpoint = match method.as_str() {
            "GET" => routing::get(handler),
            "POST" => routing::post(handler),
            "PUT" => routing::put(handler),
            "DELETE" => routing::delete(handler),
            _ => routing::any(handler),
        };
        router = router.route(&path, endpoint);
    }
    router
}

/// Collect an axum request (headers, query, path parameters, body) into
/// the binder's request value.
async fn collect_request(
    params: RawPathParams,
    req: axum::extract::Request,
) -> Result<Request, HttpError> {
    let (parts, body) = req.into_parts();
    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let query = parts.uri.query().map(str::to_string);
    let mut path_params = HashMap::new();
    for (key, value) in &params {
        path_params.insert(key.to_string(), value.to_string());
    }
    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|err| HttpError::BadRequest(format!("failed to read body: {err}")))?;
    Ok(Request {
        method: parts.method,
        path: parts.uri.path().to_string(),
        content_type,
        query,
        path_params,
        headers: parts.headers,
        body,
    })
}
