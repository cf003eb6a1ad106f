//! Standard fare error handling.

pub use failure::Error;
use failure_derive::Fail;
use handlebars::RenderError;
use lst_util::impl_from_for_error;
use lst_util::http::StatusCode;
use lst_util::rpc::RpcError;

/// Error that could occur when processing a request.
#[derive(Fail, Debug)]
pub enum WebError {
    /// The API path doesn't exist.
    #[fail(display = "not found")]
    NotFound,
    /// The requested train isn't in the mirrored state.
    #[fail(display = "no train {} in current state", _0)]
    UnknownTrain(String),
    /// RPC error from the solver.
    #[fail(display = "RPC: {}", _0)]
    Rpc(RpcError),
    /// Handlebars rendering error.
    #[fail(display = "handlebars: {}", _0)]
    Hbs(RenderError),
}

impl StatusCode for WebError {
    fn status_code(&self) -> u16 {
        use self::WebError::*;

        match *self {
            NotFound => 404,
            UnknownTrain(_) => 404,
            Rpc(ref r) => r.status_code(),
            Hbs(_) => 500,
        }
    }
}

pub type WebResult<T, E = WebError> = ::std::result::Result<T, E>;
pub type Result<T, E = Error> = ::std::result::Result<T, E>;

impl_from_for_error!(WebError,
                     RpcError => Rpc,
                     RenderError => Hbs);
