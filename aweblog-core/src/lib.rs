pub mod binder;
pub mod error;
pub mod form;
pub mod reply;
pub mod request;
pub mod route;
pub mod serve;
pub mod signature;

pub use error::{error_response, ApiError, HandlerError, HttpError};
pub use reply::{Reply, ReplyBody, SetCookie};
pub use request::Request;
pub use route::{Args, HandlerFn, HandlerFuture, Route, RouteBuilder};
pub use signature::{HandlerShape, ParamKind, ParamSpec, SignatureError};

pub mod prelude {
    //! Re-exports of the most commonly used web types.
    pub use crate::{
        ApiError, Args, HandlerError, HandlerFuture, HttpError, Reply, Request, Route, SetCookie,
    };
}
