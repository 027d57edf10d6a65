use crate::errors::ApiError;
use crate::headers::SecurityHeaders;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::{Method, Uri};
use log::error;
use std::any::Any;
use std::sync::Arc;

const GENERIC_DETAIL: &str = "An unexpected error occurred";

/// Outermost stage: logs internal errors and hides their detail outside
/// development mode
#[derive(Clone)]
pub(crate) struct ErrorBoundary {
    development: bool,
    security_headers: Arc<SecurityHeaders>,
}

impl ErrorBoundary {
    pub fn new(development: bool, security_headers: Arc<SecurityHeaders>) -> Self {
        Self {
            development,
            security_headers,
        }
    }
}

fn panic_message(err: &(dyn Any + Send)) -> &str {
    if let Some(message) = err.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        *message
    } else {
        "unknown panic"
    }
}

/// Turn a handler panic into an internal error the boundary can report
pub(crate) fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    ApiError::internal(format!("Handler panicked: {}", panic_message(err.as_ref())))
        .into_response()
}

/// Log line for a failed request, carrying the original error detail
fn failure_message(method: &Method, uri: &Uri, response: &Response) -> String {
    let detail = response
        .extensions()
        .get::<ApiError>()
        .map(|e| e.detail.as_str())
        .unwrap_or("no detail");
    format!(
        "Request {} {} failed with {}: {}",
        method,
        uri,
        response.status(),
        detail
    )
}

pub(crate) async fn error_boundary(
    State(boundary): State<ErrorBoundary>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let mut response = next.run(request).await;
    let status = response.status();
    if !status.is_server_error() {
        return response;
    }

    error!("{}", failure_message(&method, &uri, &response));

    if !boundary.development {
        response = ApiError::new(GENERIC_DETAIL, status).into_response();
    }
    // panics unwind past the security headers stage
    boundary.security_headers.apply(&mut response);
    response
}
