use crate::errors::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::header::{HOST, LOCATION};
use http::uri::Authority;
use log::warn;
use thiserror::Error;
use url::Url;

/// Host used when a request carries no `Host` header; no real host can match it
const UNKNOWN_HOST: &str = "origin.invalid";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RedirectError {
    #[error("Redirect target is not a valid URL: {0}")]
    InvalidTarget(String),
    #[error("Redirect to '{0}' is not allowed")]
    Disallowed(String),
}

/// Scheme, host and port the client addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

impl RequestOrigin {
    pub fn from_request(request: &Request) -> Self {
        let scheme = request
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .or_else(|| request.uri().scheme_str())
            .unwrap_or("http")
            .to_ascii_lowercase();

        let authority = request
            .headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Authority>().ok())
            .or_else(|| request.uri().authority().cloned());

        match authority {
            Some(authority) => Self {
                scheme,
                host: authority.host().to_ascii_lowercase(),
                port: authority.port_u16(),
            },
            None => Self {
                scheme,
                host: UNKNOWN_HOST.to_string(),
                port: None,
            },
        }
    }

    fn base_url(&self) -> Result<Url, url::ParseError> {
        match self.port {
            Some(port) => Url::parse(&format!("{}://{}:{}/", self.scheme, self.host, port)),
            None => Url::parse(&format!("{}://{}/", self.scheme, self.host)),
        }
    }
}

/// Allows same-origin redirects and same-host redirects to the declared
/// HTTPS port; everything else is refused
#[derive(Debug, Clone)]
pub struct RedirectValidator {
    https_port: u16,
}

impl RedirectValidator {
    pub fn new(https_port: u16) -> Self {
        Self { https_port }
    }

    pub fn validate(&self, origin: &RequestOrigin, location: &str) -> Result<(), RedirectError> {
        let base = origin
            .base_url()
            .map_err(|_| RedirectError::InvalidTarget(location.to_string()))?;
        // resolves relative and protocol-relative (`//host/path`) targets too
        let target = base
            .join(location)
            .map_err(|_| RedirectError::InvalidTarget(location.to_string()))?;

        let same_host = target.host_str() == base.host_str();
        let same_origin = same_host
            && target.scheme() == base.scheme()
            && target.port_or_known_default() == base.port_or_known_default();
        let https_upgrade = same_host
            && target.scheme() == "https"
            && target.port_or_known_default() == Some(self.https_port);

        if same_origin || https_upgrade {
            Ok(())
        } else {
            Err(RedirectError::Disallowed(location.to_string()))
        }
    }
}

/// Replace redirects to disallowed targets with an error response
pub(crate) async fn validate_redirects(
    State(validator): State<RedirectValidator>,
    request: Request,
    next: Next,
) -> Response {
    let origin = RequestOrigin::from_request(&request);
    let response = next.run(request).await;
    if !response.status().is_redirection() {
        return response;
    }
    let Some(location) = response.headers().get(LOCATION) else {
        return response;
    };

    let result = match location.to_str() {
        Ok(location) => validator.validate(&origin, location),
        Err(_) => Err(RedirectError::InvalidTarget(
            String::from_utf8_lossy(location.as_bytes()).into_owned(),
        )),
    };
    match result {
        Ok(()) => response,
        Err(e) => {
            warn!("Blocked redirect: {}", e);
            ApiError::internal(e.to_string()).into_response()
        }
    }
}
