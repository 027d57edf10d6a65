//! The request pipeline as an explicit, ordered list of stages
//!
//! Every request traverses [`STAGES`] front to back. Any stage may answer the
//! request itself (reject, redirect, serve a file), in which case no later
//! stage runs. Stages before [`Stage::Routing`] see every request; stages after
//! it only see requests that matched an endpoint.

pub(crate) mod authentication;
pub(crate) mod authorization;
pub(crate) mod boundary;
pub(crate) mod redirect;
pub(crate) mod security_headers;
pub(crate) mod static_files;

use crate::pipeline::authorization::{Access, AccessTable, AuthorizationState};
use crate::pipeline::boundary::ErrorBoundary;
use crate::pipeline::redirect::RedirectValidator;
use crate::pipeline::static_files::StaticFiles;
use crate::state::AppState;
use axum::handler::Handler;
use axum::middleware::from_fn_with_state;
use axum::routing::{self, MethodRouter};
use axum::Router;
use http::Method;
use log::debug;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;

/// One unit of request processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Converts panics and internal errors into a safe response
    ErrorBoundary,
    /// Attaches the fixed security header set to every response
    SecurityHeaders,
    /// Serves the front-end bundle to anonymous users
    StaticFiles,
    /// Matches the request against the declared endpoints
    Routing,
    /// Refuses redirects to foreign hosts
    RedirectValidation,
    /// Introspects the bearer token and attaches the principal
    Authentication,
    /// Evaluates the endpoint's declared access rule
    Authorization,
    /// Runs the matched handler
    Endpoint,
}

/// The order every request traverses the pipeline in
pub const STAGES: [Stage; 8] = [
    Stage::ErrorBoundary,
    Stage::SecurityHeaders,
    Stage::StaticFiles,
    Stage::Routing,
    Stage::RedirectValidation,
    Stage::Authentication,
    Stage::Authorization,
    Stage::Endpoint,
];

impl Stage {
    /// Whether the stage only runs for requests that matched an endpoint
    pub fn is_routed(self) -> bool {
        self > Stage::Routing
    }
}

/// Endpoints together with the access rule each of them declares
pub struct Endpoints {
    router: Router<AppState>,
    access: AccessTable,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new()
    }
}

impl Endpoints {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            access: AccessTable::default(),
        }
    }

    fn add(
        mut self,
        method: Method,
        path: &'static str,
        access: Access,
        method_router: MethodRouter<AppState>,
    ) -> Self {
        self.access.insert(method, path, access);
        self.router = self.router.route(path, method_router);
        self
    }

    pub fn get<H, T>(self, path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::GET, path, access, routing::get(handler))
    }

    pub fn post<H, T>(self, path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::POST, path, access, routing::post(handler))
    }

    pub fn put<H, T>(self, path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::PUT, path, access, routing::put(handler))
    }

    pub fn delete<H, T>(self, path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::DELETE, path, access, routing::delete(handler))
    }

    pub fn access(&self) -> &AccessTable {
        &self.access
    }
}

/// Assemble [`STAGES`] around `endpoints`.
///
/// axum runs the layer added last first, so stages are applied back to
/// front: routed stages as route layers, the rest as router layers.
pub fn build(state: AppState, endpoints: Endpoints) -> Router {
    let Endpoints { router, access } = endpoints;
    let authorization = AuthorizationState {
        access: Arc::new(access),
        policies: state.policies.clone(),
    };

    let mut app = router;
    for stage in STAGES.iter().rev() {
        debug!("Adding pipeline stage {:?} (routed: {})", stage, stage.is_routed());
        app = match stage {
            Stage::Endpoint | Stage::Routing => app,
            Stage::Authorization => app.route_layer(from_fn_with_state(
                authorization.clone(),
                authorization::authorize_request,
            )),
            Stage::Authentication => app.route_layer(from_fn_with_state(
                state.introspection.clone(),
                authentication::authenticate,
            )),
            Stage::RedirectValidation => app.route_layer(from_fn_with_state(
                RedirectValidator::new(state.settings.https_port),
                redirect::validate_redirects,
            )),
            Stage::StaticFiles => app.layer(from_fn_with_state(
                StaticFiles::new(&state.settings.static_files.root),
                static_files::serve_static,
            )),
            Stage::SecurityHeaders => app.layer(from_fn_with_state(
                state.security_headers.clone(),
                security_headers::apply_security_headers,
            )),
            Stage::ErrorBoundary => app
                .layer(CatchPanicLayer::custom(boundary::panic_response))
                .layer(from_fn_with_state(
                    ErrorBoundary::new(state.settings.development, state.security_headers.clone()),
                    boundary::error_boundary,
                )),
        };
    }
    app.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert_eq!(
            STAGES,
            [
                Stage::ErrorBoundary,
                Stage::SecurityHeaders,
                Stage::StaticFiles,
                Stage::Routing,
                Stage::RedirectValidation,
                Stage::Authentication,
                Stage::Authorization,
                Stage::Endpoint,
            ]
        );
    }

    #[test]
    fn test_stages_are_strictly_ordered() {
        assert!(STAGES.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_security_stages_wrap_static_files() {
        let position = |stage| STAGES.iter().position(|s| *s == stage).unwrap();
        assert!(position(Stage::ErrorBoundary) < position(Stage::SecurityHeaders));
        assert!(position(Stage::SecurityHeaders) < position(Stage::StaticFiles));
        assert!(position(Stage::StaticFiles) < position(Stage::Authentication));
        assert!(position(Stage::Authentication) < position(Stage::Authorization));
        assert!(position(Stage::Authorization) < position(Stage::Endpoint));
    }

    #[test]
    fn test_routed_stages() {
        let routed: Vec<Stage> = STAGES.into_iter().filter(|s| s.is_routed()).collect();
        assert_eq!(
            routed,
            vec![
                Stage::RedirectValidation,
                Stage::Authentication,
                Stage::Authorization,
                Stage::Endpoint,
            ]
        );
    }

    #[test]
    fn test_endpoints_record_access() {
        async fn handler() {}

        let endpoints = Endpoints::new()
            .get("/open", Access::Anonymous, handler)
            .post("/open", Access::Policy("records-admin"), handler);

        assert_eq!(
            endpoints.access().lookup(&Method::GET, "/open"),
            Access::Anonymous
        );
        assert_eq!(
            endpoints.access().lookup(&Method::POST, "/open"),
            Access::Policy("records-admin")
        );
    }

    mod requests {
        use super::*;
        use crate::test_utils::TestFixture;
        use axum::body::Body;
        use axum::response::Redirect;
        use http::{Request, StatusCode};

        async fn panics() -> &'static str {
            panic!("object reference not set")
        }

        async fn redirect_away() -> Redirect {
            Redirect::to("https://evil.example.com/phish")
        }

        async fn redirect_to_https() -> Redirect {
            Redirect::to("https://localhost:44348/api/identity")
        }

        fn fault_endpoints() -> Endpoints {
            Endpoints::new()
                .get("/fault", Access::Anonymous, panics)
                .get("/away", Access::Anonymous, redirect_away)
                .get("/secure", Access::Anonymous, redirect_to_https)
        }

        #[tokio::test]
        async fn test_static_files_carry_security_headers() {
            let fixture = TestFixture::new().await;

            let response = fixture.get("/js/oidc-client.min.js").await;
            response.assert_ok().assert_security_headers();
            assert_eq!(response.body, "// oidc");
            assert_eq!(
                response.header("strict-transport-security"),
                Some("max-age=31536000")
            );

            let response = fixture.get("/").await;
            response.assert_ok().assert_security_headers();
            assert!(response.body.contains("<title>records</title>"));
        }

        #[tokio::test]
        async fn test_static_files_ignore_authentication_state() {
            let fixture = TestFixture::new().await;
            fixture.mock_inactive_token("stale-token").await;

            let response = fixture
                .get_with_token("/index.html", "stale-token")
                .await;
            response.assert_ok().assert_security_headers();
        }

        #[tokio::test]
        async fn test_static_files_only_answer_reads() {
            let fixture = TestFixture::new().await;

            let request = fixture
                .request_builder(http::Method::POST, "/index.html", None)
                .body(Body::empty())
                .unwrap();
            let response = fixture.send(request).await;
            assert_ne!(response.status, StatusCode::OK);
            response.assert_security_headers();
        }

        #[tokio::test]
        async fn test_unmatched_path_carries_security_headers() {
            let fixture = TestFixture::new().await;

            let response = fixture.get("/does/not/exist").await;
            response
                .assert_status(StatusCode::NOT_FOUND)
                .assert_security_headers();
        }

        #[tokio::test]
        async fn test_development_mode_skips_hsts() {
            let fixture = TestFixture::development().await;

            let response = fixture.get("/health").await;
            response.assert_ok().assert_security_headers();
            assert_eq!(response.header("strict-transport-security"), None);
        }

        #[tokio::test]
        async fn test_head_uses_get_access_rule() {
            let fixture = TestFixture::new().await;

            let request = fixture
                .request_builder(http::Method::HEAD, "/health", None)
                .body(Body::empty())
                .unwrap();
            fixture.send(request).await.assert_ok();
        }

        #[tokio::test]
        async fn test_panic_is_generic_in_production() {
            let fixture = TestFixture::with_endpoints(fault_endpoints).await;

            let response = fixture.get("/fault").await;
            response
                .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
                .assert_security_headers();
            assert_eq!(response.json["detail"], "An unexpected error occurred");
            assert!(!response.body.contains("object reference"));
        }

        #[tokio::test]
        async fn test_panic_detail_in_development() {
            let fixture = TestFixture::build(
                |settings| settings.development = true,
                |state| build(state, fault_endpoints()),
            )
            .await;

            let response = fixture.get("/fault").await;
            response
                .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
                .assert_security_headers();
            assert_eq!(
                response.json["detail"],
                "Handler panicked: object reference not set"
            );
        }

        #[tokio::test]
        async fn test_redirect_to_other_host_is_blocked() {
            let fixture = TestFixture::with_endpoints(fault_endpoints).await;

            let response = fixture.get("/away").await;
            response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(response.header("location"), None);
        }

        #[tokio::test]
        async fn test_redirect_to_https_port_is_allowed() {
            let fixture = TestFixture::with_endpoints(fault_endpoints).await;

            let response = fixture.get("/secure").await;
            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(
                response.header("location"),
                Some("https://localhost:44348/api/identity")
            );
        }

        #[tokio::test]
        async fn test_redirect_without_host_header_is_blocked() {
            let fixture = TestFixture::with_endpoints(fault_endpoints).await;

            let request = Request::builder()
                .uri("/secure")
                .body(Body::empty())
                .unwrap();
            let response = fixture.send(request).await;
            response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
