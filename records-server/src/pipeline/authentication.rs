use crate::auth::introspection::{Introspection, IntrospectionClient};
use crate::auth::Authentication;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::HeaderMap;
use log::{debug, warn};
use std::sync::Arc;

/// Extract the token from an `Authorization: Bearer <token>` header.
/// Other schemes are ignored rather than rejected.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Introspect the presented token and record the outcome in the request
/// extensions. Never rejects by itself; the authorization stage decides.
pub(crate) async fn authenticate(
    State(introspection): State<Arc<IntrospectionClient>>,
    mut request: Request,
    next: Next,
) -> Response {
    let authentication = match bearer_token(request.headers()) {
        None => Authentication::Anonymous,
        Some(token) => match introspection.introspect(&token).await {
            Ok(Introspection::Active(principal)) => {
                debug!(
                    "Authenticated '{}'",
                    principal.name().unwrap_or("<unnamed>")
                );
                Authentication::Authenticated(principal)
            }
            Ok(Introspection::Inactive) => {
                warn!("Rejected inactive access token");
                Authentication::Rejected
            }
            Err(e) => {
                warn!("Token introspection failed: {}", e);
                Authentication::Rejected
            }
        },
    };

    request.extensions_mut().insert(authentication);
    next.run(request).await
}
