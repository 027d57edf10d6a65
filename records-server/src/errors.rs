use axum::response::IntoResponse;
use axum::Json;
use http::header::WWW_AUTHENTICATE;
use http::{HeaderValue, StatusCode};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub detail: String,
    pub status_code: StatusCode,
    /// Value of the `WWW-Authenticate` challenge sent with 401 responses
    pub challenge: Option<&'static str>,
}

impl ApiError {
    /// Create a new ApiError with a detail message and status code
    pub fn new<S: ToString>(detail: S, status_code: StatusCode) -> Self {
        Self {
            detail: detail.to_string(),
            status_code,
            challenge: None,
        }
    }

    /// Create new Internal Server Error (500) with a detail message
    pub fn internal<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Create new Bad Request Error (400) with a detail message
    pub fn bad_request<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::BAD_REQUEST)
    }

    /// Create new Not Found Error (404) with a detail message
    pub fn not_found<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::NOT_FOUND)
    }

    /// Create new Unauthorized Error (401) carrying a bearer challenge
    pub fn unauthorized<S: ToString>(detail: S, challenge: &'static str) -> Self {
        Self {
            challenge: Some(challenge),
            ..Self::new(detail, StatusCode::UNAUTHORIZED)
        }
    }

    /// Create new Forbidden Error (403) with a detail message
    pub fn forbidden<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::FORBIDDEN)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code;
        let body = json!({
            "detail": self.detail,
        });
        let mut response = (status_code, Json(body)).into_response();
        if let Some(challenge) = self.challenge {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }
        // the error boundary reads the original error back from the extensions
        response.extensions_mut().insert(self);
        response
    }
}
