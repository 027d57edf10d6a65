use crate::auth::introspection::IntrospectionClient;
use crate::auth::policy::PolicyRegistry;
use crate::config::Settings;
use crate::headers::SecurityHeaders;
use crate::repository::{create_repository, DataEventRecordRepository};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub introspection: Arc<IntrospectionClient>,
    pub policies: Arc<PolicyRegistry>,
    pub security_headers: Arc<SecurityHeaders>,
    pub records: Arc<dyn DataEventRecordRepository>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, std::io::Error> {
        let http = IntrospectionClient::http_client(settings.auth_configuration.timeout_secs)
            .map_err(|e| {
                std::io::Error::other(format!("Failed to create introspection client: {e}"))
            })?;
        let introspection = IntrospectionClient::new(
            http,
            &settings.auth_configuration,
            &settings.auth_secrets_configuration,
        );
        let security_headers =
            SecurityHeaders::from_config(&settings.security_headers, settings.development);
        let records = create_repository(&settings.connection_strings.default_connection);

        Ok(Self {
            introspection: Arc::new(introspection),
            policies: Arc::new(PolicyRegistry::records()),
            security_headers: Arc::new(security_headers),
            records,
            settings: Arc::new(settings),
        })
    }
}
