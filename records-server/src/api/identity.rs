use crate::auth::{Claim, ClaimsPrincipal};
use crate::openapi::IDENTITY_TAG;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// The caller as seen by the resource server
#[derive(Debug, Serialize, ToSchema)]
pub struct Identity {
    pub name: Option<String>,
    pub claims: Vec<Claim>,
}

/// Echo the caller's name and claims
#[utoipa::path(
    get,
    path = "/api/identity",
    tag = IDENTITY_TAG,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The authenticated principal", body = Identity),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Token lacks the records scope")
    )
)]
pub(crate) async fn identity(principal: ClaimsPrincipal) -> Json<Identity> {
    Json(Identity {
        name: principal.name().map(str::to_string),
        claims: principal.claims().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use crate::test_utils::TestFixture;
    use http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_identity_echoes_claims() {
        let fixture = TestFixture::new().await;
        fixture
            .mock_active_token(
                "scoped-token",
                json!({"scope": "openid records", "role": "records.user"}),
            )
            .await;

        let response = fixture
            .get_with_token("/api/identity", "scoped-token")
            .await;
        response.assert_ok();
        assert_eq!(response.json["name"], "scoped-token@example.com");
        let claims = response.json["claims"].as_array().unwrap();
        assert!(claims.contains(&json!({"type": "scope", "value": "records"})));
        assert!(claims.contains(&json!({"type": "role", "value": "records.user"})));
    }

    #[tokio::test]
    async fn test_identity_requires_records_scope() {
        let fixture = TestFixture::new().await;
        fixture
            .mock_active_token("unscoped-token", json!({"scope": "openid"}))
            .await;

        let response = fixture
            .get_with_token("/api/identity", "unscoped-token")
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }
}
