use crate::api::health::Health;
use crate::api::identity::Identity;
use crate::auth::Claim;
use crate::headers::ExtraPolicySources;
use crate::repository::{DataEventRecord, DataEventRecordInput};
use axum::response::{Html, IntoResponse};
use axum::{Extension, Json};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::Scalar;

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const RECORDS_TAG: &str = "Data Event Records API";
pub(crate) const IDENTITY_TAG: &str = "Identity API";

/// Origin of the Scalar bundle referenced by the documentation page
const SCALAR_CDN: &str = "https://cdn.jsdelivr.net";

/// The documentation page loads Scalar from its CDN and Scalar injects its
/// own styles at runtime
const SCALAR_POLICY: ExtraPolicySources = ExtraPolicySources {
    script_sources: &[SCALAR_CDN],
    style_sources: &["'unsafe-inline'"],
};

/// Registers the bearer scheme the protected endpoints refer to
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::health::health_check,
        crate::api::records::list_records,
        crate::api::records::get_record,
        crate::api::records::create_record,
        crate::api::records::update_record,
        crate::api::records::delete_record,
        crate::api::identity::identity,
    ),
    components(schemas(Health, DataEventRecord, DataEventRecordInput, Identity, Claim)),
    modifiers(&BearerSecurity),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = RECORDS_TAG, description = "Data event record endpoints"),
        (name = IDENTITY_TAG, description = "Caller identity endpoints"),
    ),
    info(
        title = "Data Event Records API",
        description = "Resource server for data event records",
        version = "1.0.0"
    )
)]
pub(crate) struct ApiDoc;

/// Handler for the OpenAPI JSON specification endpoint
pub(crate) async fn openapi_json_handler() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Handler for the Scalar documentation endpoint
pub(crate) async fn scalar_handler() -> impl IntoResponse {
    (
        Extension(SCALAR_POLICY),
        Html(Scalar::new(ApiDoc::openapi()).to_html()),
    )
}
