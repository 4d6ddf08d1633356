use crate::error::{HandlerError, HttpError};
use crate::form;
use crate::reply::Reply;
use crate::request::Request;
use crate::route::{Args, Route};
use serde_json::{Map, Value};

/// Assemble call arguments from `request` using the route's precomputed
/// shape, then invoke the handler.
///
/// Client-side problems (unusable content type, malformed body, missing
/// required arguments) come back as `HttpError::BadRequest` before the
/// handler runs. Application errors raised by the handler become a
/// structured error reply; anything else propagates.
pub async fn dispatch(route: &Route, request: Request) -> Result<Reply, HttpError> {
    let shape = route.shape();

    let mut parsed: Option<Map<String, Value>> = None;
    if shape.wants_args() {
        if request.is_body_method() {
            parsed = Some(parse_body(&request)?);
        } else if let Some(query) = request.query.as_deref() {
            if !query.is_empty() {
                parsed = Some(form::parse_query(query));
            }
        }
    }

    let mut values = match parsed {
        // nothing parsed: the path parameters are the argument mapping
        None => request
            .path_params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
        Some(mut map) => {
            if !shape.has_catch_all() && !shape.named().is_empty() {
                // extra values are not errors, just ignored
                map.retain(|key, _| shape.named().iter().any(|name| *name == key.as_str()));
            }
            for (key, value) in &request.path_params {
                if map.contains_key(key) {
                    tracing::warn!(
                        param = %key,
                        handler = %route.name(),
                        "path parameter overrides duplicate argument"
                    );
                }
                map.insert(key.clone(), Value::String(value.clone()));
            }
            map
        }
    };

    for (name, default) in shape.defaults() {
        if !values.contains_key(*name) {
            values.insert((*name).to_string(), default.clone());
        }
    }

    for name in shape.required() {
        if !values.contains_key(*name) {
            return Err(HttpError::BadRequest(format!("missing argument: {name}")));
        }
    }

    let passthrough = shape.has_request().then(|| request);
    tracing::debug!(handler = %route.name(), "invoking handler");
    match (route.handler())(Args::new(values, passthrough)).await {
        Ok(reply) => Ok(reply),
        Err(HandlerError::Api(err)) => Ok(Reply::json(serde_json::json!({
            "error": err.error,
            "data": err.data,
            "message": err.message,
        }))),
        Err(HandlerError::Http(err)) => Err(err),
    }
}

/// Parse a body-bearing request into the flat argument mapping, by content
/// type.
fn parse_body(request: &Request) -> Result<Map<String, Value>, HttpError> {
    let Some(content_type) = request.content_type.as_deref() else {
        return Err(HttpError::BadRequest("missing content type".to_string()));
    };
    let normalized = content_type.to_ascii_lowercase();
    if normalized.starts_with("application/json") {
        let body: Value = serde_json::from_slice(&request.body)
            .map_err(|err| HttpError::BadRequest(format!("invalid json body: {err}")))?;
        match body {
            Value::Object(map) => Ok(map),
            _ => Err(HttpError::BadRequest(
                "json body must be an object".to_string(),
            )),
        }
    } else if normalized.starts_with("application/x-www-form-urlencoded") {
        Ok(form::parse_urlencoded(&request.body))
    } else if normalized.starts_with("multipart/form-data") {
        form::parse_multipart(content_type, &request.body).map_err(HttpError::BadRequest)
    } else {
        Err(HttpError::BadRequest(format!(
            "unsupported content type: {content_type}"
        )))
    }
}
