use super::guard::SessionRejection;
use super::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use std::future::{Ready, ready};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Rejection, Reply, reject};

/// Renders guard failures. Injected at construction so callers can brand their own pages.
pub trait FailureResponder: Send + Sync {
    fn unauthorized(&self, denial: Denial) -> Response;
    fn internal_error(&self, message: &str) -> Response;
}

/// Bare status lines.
pub struct PlainFailureResponder;

impl FailureResponder for PlainFailureResponder {
    fn unauthorized(&self, _denial: Denial) -> Response {
        warp::reply::with_status("Unauthorized", StatusCode::UNAUTHORIZED).into_response()
    }

    fn internal_error(&self, _message: &str) -> Response {
        warp::reply::with_status("Internal Server Error", StatusCode::INTERNAL_SERVER_ERROR)
            .into_response()
    }
}

/// Build a `recover` handler that renders rejections with `responder`.
pub fn recover_with(
    responder: Arc<dyn FailureResponder>,
) -> impl Fn(Rejection) -> Ready<Result<Response, Infallible>> + Clone + Send + Sync + 'static {
    move |err: Rejection| ready(Ok(render(responder.as_ref(), &err)))
}

fn render(responder: &dyn FailureResponder, err: &Rejection) -> Response {
    if let Some(rejection) = err.find::<SessionRejection>() {
        let mut response = match &rejection.error {
            SessionError::Unauthorized(denial) => responder.unauthorized(*denial),
            SessionError::InternalError(message) => {
                warn!("Internal error: {}", message);
                responder.internal_error(message)
            }
        };
        if let Some(clear) = &rejection.clear {
            clear.apply(&mut response);
        }
        response
    } else if let Some(code) = err.find::<ApiErrorCode>() {
        let status = match code {
            ApiErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
        };
        let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
        warp::reply::with_status(json, status).into_response()
    } else if err.is_not_found() {
        warp::reply::with_status("Not Found", StatusCode::NOT_FOUND).into_response()
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        warp::reply::with_status("Method Not Allowed", StatusCode::METHOD_NOT_ALLOWED)
            .into_response()
    } else {
        warn!("Unhandled rejection: {:?}", err);
        responder.internal_error(&format!("{:?}", err))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid username or password")]
    InvalidCredentials,
}

impl reject::Reject for ApiErrorCode {}
