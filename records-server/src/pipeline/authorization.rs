use crate::auth::policy::{Decision, PolicyRegistry};
use crate::auth::Authentication;
use crate::errors::ApiError;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::Method;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Challenge sent when no token was presented
const BEARER_CHALLENGE: &str = "Bearer";
/// Challenge sent when the presented token was rejected
const INVALID_TOKEN_CHALLENGE: &str = "Bearer error=\"invalid_token\"";

/// Access rule an endpoint declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No authentication required
    Anonymous,
    /// Any authenticated principal
    Authenticated,
    /// An authenticated principal satisfying the named policy
    Policy(&'static str),
}

/// Access rules by route path and method
#[derive(Debug, Clone, Default)]
pub struct AccessTable {
    rules: HashMap<&'static str, HashMap<Method, Access>>,
}

impl AccessTable {
    pub fn insert(&mut self, method: Method, path: &'static str, access: Access) {
        self.rules.entry(path).or_default().insert(method, access);
    }

    /// Rule for `method` on the route `path`. HEAD falls back to GET;
    /// undeclared combinations require authentication.
    pub fn lookup(&self, method: &Method, path: &str) -> Access {
        let Some(methods) = self.rules.get(path) else {
            return Access::Authenticated;
        };
        methods
            .get(method)
            .or_else(|| (*method == Method::HEAD).then(|| methods.get(&Method::GET)).flatten())
            .copied()
            .unwrap_or(Access::Authenticated)
    }
}

#[derive(Clone)]
pub(crate) struct AuthorizationState {
    pub access: Arc<AccessTable>,
    pub policies: Arc<PolicyRegistry>,
}

/// Decide whether a request with the given authentication outcome may reach
/// an endpoint declaring `access`
pub(crate) fn authorize(
    access: Access,
    authentication: &Authentication,
    policies: &PolicyRegistry,
) -> Result<(), ApiError> {
    if access == Access::Anonymous {
        return Ok(());
    }

    let principal = match authentication {
        Authentication::Authenticated(principal) => principal,
        Authentication::Anonymous => {
            return Err(ApiError::unauthorized(
                "Authentication required",
                BEARER_CHALLENGE,
            ))
        }
        Authentication::Rejected => {
            return Err(ApiError::unauthorized(
                "The access token is invalid or expired",
                INVALID_TOKEN_CHALLENGE,
            ))
        }
    };

    match access {
        Access::Policy(name) => match policies.evaluate(name, principal) {
            Decision::Allow => Ok(()),
            Decision::Deny => {
                warn!(
                    "Principal '{}' does not satisfy policy '{}'",
                    principal.name().unwrap_or("<unnamed>"),
                    name
                );
                Err(ApiError::forbidden(
                    "You are not authorized to access this resource",
                ))
            }
        },
        _ => Ok(()),
    }
}

pub(crate) async fn authorize_request(
    State(state): State<AuthorizationState>,
    request: Request,
    next: Next,
) -> Response {
    let access = match request.extensions().get::<MatchedPath>() {
        Some(path) => state.access.lookup(request.method(), path.as_str()),
        None => Access::Authenticated,
    };
    let authentication = request
        .extensions()
        .get::<Authentication>()
        .cloned()
        .unwrap_or(Authentication::Anonymous);

    match authorize(access, &authentication, &state.policies) {
        Ok(()) => {
            debug!("Access {:?} granted for {}", access, request.uri().path());
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
