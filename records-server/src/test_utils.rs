use crate::config::Settings;
use crate::create_app;
use crate::pipeline::{self, Endpoints};
use crate::state::AppState;
use axum::body::Body;
use axum::Router;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

/// Test fixture for exercising the full request pipeline against a mocked
/// authority.
///
/// The fixture starts a wiremock server that plays the authority (metadata
/// document and introspection endpoint) and a temporary static root holding a
/// minimal front-end bundle.
///
/// # Examples
///
/// ```rust
/// #[tokio::test]
/// async fn test_endpoint() {
///     let fixture = TestFixture::new().await;
///     fixture
///         .mock_active_token("admin-token", json!({"role": "records.admin"}))
///         .await;
///
///     let response = fixture
///         .get_with_token("/api/DataEventRecords", "admin-token")
///         .await;
///     response.assert_ok();
/// }
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Configuration settings
    pub settings: Settings,
    /// Shared state behind the router
    pub state: AppState,
    /// Mock server playing the authority
    pub authority: MockServer,
    /// Static root; removed when the fixture is dropped
    pub static_root: TempDir,
}

impl TestFixture {
    /// Creates a fixture with production settings
    pub async fn new() -> Self {
        Self::with_settings(|_| {}).await
    }

    /// Creates a fixture in development mode
    pub async fn development() -> Self {
        Self::with_settings(|settings| settings.development = true).await
    }

    /// Creates a fixture serving the default endpoints after `customize` has
    /// adjusted the settings
    pub async fn with_settings(customize: impl FnOnce(&mut Settings)) -> Self {
        Self::build(customize, create_app).await
    }

    /// Creates a fixture serving `endpoints` instead of the default ones
    pub async fn with_endpoints(endpoints: impl FnOnce() -> Endpoints) -> Self {
        Self::build(|_| {}, |state| pipeline::build(state, endpoints())).await
    }

    pub(crate) async fn build(
        customize: impl FnOnce(&mut Settings),
        app: impl FnOnce(AppState) -> Router,
    ) -> Self {
        Self::setup_logger(LevelFilter::Debug);

        let static_root = TempDir::new().expect("Failed to create static root");
        std::fs::write(
            static_root.path().join("index.html"),
            "<!doctype html><title>records</title>",
        )
        .expect("Failed to write index.html");
        std::fs::create_dir_all(static_root.path().join("js")).expect("Failed to create js dir");
        std::fs::write(static_root.path().join("js/oidc-client.min.js"), "// oidc")
            .expect("Failed to write vendor script");

        let authority = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": authority.uri(),
                "introspection_endpoint": format!("{}/connect/introspect", authority.uri()),
            })))
            .mount(&authority)
            .await;

        let mut settings = Settings::for_test_with_authority(&authority, static_root.path());
        customize(&mut settings);

        let state = AppState::new(settings.clone()).expect("Failed to create app state");
        let app = app(state.clone());

        Self {
            app,
            settings,
            state,
            authority,
            static_root,
        }
    }

    /// Initializes the test logger with the given level
    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    /// Makes the authority report `token` as active with the given claims
    pub async fn mock_active_token(&self, token: &str, claims: Value) {
        let mut body = json!({ "active": true, "email": format!("{token}@example.com") });
        if let (Some(body), Value::Object(claims)) = (body.as_object_mut(), claims) {
            body.extend(claims);
        }
        self.mock_introspection(token, body).await;
    }

    /// Makes the authority report `token` as inactive
    pub async fn mock_inactive_token(&self, token: &str) {
        self.mock_introspection(token, json!({ "active": false })).await;
    }

    async fn mock_introspection(&self, token: &str, body: Value) {
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/connect/introspect"))
            .and(matchers::body_string_contains(format!("token={token}&")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.authority)
            .await;
    }

    /// Creates a request builder, with a bearer token when one is given
    pub fn request_builder(
        &self,
        method: Method,
        uri: impl AsRef<str>,
        token: Option<&str>,
    ) -> http::request::Builder {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri.as_ref())
            .header("Host", "localhost:5000");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder
    }

    /// Sends an anonymous GET request
    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        let request = self
            .request_builder(Method::GET, uri, None)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Sends a GET request carrying `token`
    pub async fn get_with_token(&self, uri: impl AsRef<str>, token: &str) -> TestResponse {
        let request = self
            .request_builder(Method::GET, uri, Some(token))
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Sends a JSON request carrying `token`
    pub async fn send_json<T: Serialize>(
        &self,
        method: Method,
        uri: impl AsRef<str>,
        token: Option<&str>,
        body: &T,
    ) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let request = self
            .request_builder(method, uri, token)
            .header("Content-Type", "application/json")
            .body(Body::from(json_body))
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        // Try to parse as JSON, defaulting to empty object if parsing fails or empty body
        let json = if !body.is_empty() {
            serde_json::from_slice(&body).unwrap_or_else(|_| json!({}))
        } else {
            json!({})
        };

        TestResponse {
            status,
            headers,
            json,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }
}

/// Response from a test request that provides convenient access to status,
/// headers and body.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
    pub body: String,
}

impl TestResponse {
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {} but got {} with body: {}",
            expected, self.status, self.body
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Asserts that the fixed security header set is present
    pub fn assert_security_headers(&self) -> &Self {
        assert_eq!(self.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(self.header("referrer-policy"), Some("no-referrer"));
        assert_eq!(self.header("x-frame-options"), Some("DENY"));
        assert_eq!(self.header("x-xss-protection"), Some("1; mode=block"));
        let csp = self
            .header("content-security-policy")
            .expect("Missing content-security-policy");
        assert!(csp.contains("block-all-mixed-content"), "{csp}");
        assert!(csp.contains("script-src 'self'"), "{csp}");
        assert!(csp.contains("style-src 'self'"), "{csp}");
        self
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).unwrap_or_else(|e| {
            panic!(
                "Failed to deserialize response: {e}\nBody: {}",
                self.body
            )
        })
    }
}
