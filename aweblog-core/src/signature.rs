use serde_json::Value;

/// How a single declared handler parameter is supplied at request time.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Supplied by name from path parameters.
    Positional,
    /// Keyword-only with no default; must be present or the request is
    /// rejected.
    Required,
    /// Keyword-only with a default injected when absent.
    Optional(Value),
    /// Absorbs any number of additional named arguments.
    CatchAll,
    /// The live request object, injected by the binder.
    Request,
}

/// One declared parameter of a handler.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub fn new(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind }
    }
}

/// A handler declaration rejected at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// A positional parameter was declared after the request parameter;
    /// only keyword-only and catchall parameters may follow it.
    RequestNotLast { handler: String, param: String },
    DuplicateParam { handler: String, param: String },
}

impl std::fmt::Display for SignatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureError::RequestNotLast { handler, param } => write!(
                f,
                "request parameter must be the last named parameter in handler '{handler}' \
                 (found '{param}' after it)"
            ),
            SignatureError::DuplicateParam { handler, param } => {
                write!(f, "duplicate parameter '{param}' in handler '{handler}'")
            }
        }
    }
}

impl std::error::Error for SignatureError {}

/// Parameter classification for one handler, computed once at registration
/// time and reused unchanged on every request.
#[derive(Debug, Clone, Default)]
pub struct HandlerShape {
    has_request: bool,
    has_catch_all: bool,
    named: Vec<&'static str>,
    required: Vec<&'static str>,
    defaults: Vec<(&'static str, Value)>,
}

impl HandlerShape {
    /// Classify `params` for the handler called `handler`.
    pub fn analyze(handler: &str, params: &[ParamSpec]) -> Result<Self, SignatureError> {
        let mut shape = Self::default();
        let mut seen: Vec<&str> = Vec::new();
        let mut after_request = false;
        for param in params {
            if seen.contains(&param.name) {
                return Err(SignatureError::DuplicateParam {
                    handler: handler.to_string(),
                    param: param.name.to_string(),
                });
            }
            seen.push(param.name);
            match &param.kind {
                ParamKind::Positional => {
                    if after_request {
                        return Err(SignatureError::RequestNotLast {
                            handler: handler.to_string(),
                            param: param.name.to_string(),
                        });
                    }
                }
                ParamKind::Required => {
                    shape.named.push(param.name);
                    shape.required.push(param.name);
                }
                ParamKind::Optional(default) => {
                    shape.named.push(param.name);
                    shape.defaults.push((param.name, default.clone()));
                }
                ParamKind::CatchAll => shape.has_catch_all = true,
                ParamKind::Request => {
                    shape.has_request = true;
                    after_request = true;
                }
            }
        }
        Ok(shape)
    }

    /// Whether the handler wants the live request injected.
    pub fn has_request(&self) -> bool {
        self.has_request
    }

    pub fn has_catch_all(&self) -> bool {
        self.has_catch_all
    }

    /// Keyword-only parameter names, in declaration order.
    pub fn named(&self) -> &[&'static str] {
        &self.named
    }

    /// The subset of keyword-only parameters with no default.
    pub fn required(&self) -> &[&'static str] {
        &self.required
    }

    pub fn defaults(&self) -> &[(&'static str, Value)] {
        &self.defaults
    }

    /// Whether the binder must assemble arguments from the body or query
    /// string at all.
    pub fn wants_args(&self) -> bool {
        self.has_catch_all || !self.named.is_empty()
    }
}
