//! Authority and client credentials used for token introspection

use super::ConfigurationLoadError;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use url::Url;

/// Authority configuration (`auth_configuration` section)
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfiguration {
    /// Base URL of the token-issuing authority
    pub sts_server_identity_url: String,

    /// Client identifier presented to the introspection endpoint
    /// (default: DataEventRecordsApi)
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Claim used as the principal's display identity (default: email)
    #[serde(default = "default_name_claim_type")]
    pub name_claim_type: String,

    /// Explicit introspection endpoint; discovered from the authority's
    /// metadata document when unset
    #[serde(default)]
    pub introspection_endpoint: Option<String>,

    /// Timeout for calls to the authority in seconds (default: 5)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How long active introspection results are cached, 0 disables caching
    #[serde(default)]
    pub cache_ttl_secs: u64,
}

fn default_client_id() -> String {
    "DataEventRecordsApi".to_string()
}

fn default_name_claim_type() -> String {
    "email".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

impl AuthConfiguration {
    /// The authority URL without trailing slashes, so joined paths never
    /// contain `//`
    pub fn authority(&self) -> &str {
        self.sts_server_identity_url.trim_end_matches('/')
    }

    pub(super) fn validate(&self) -> Result<(), ConfigurationLoadError> {
        let authority = Url::parse(self.authority()).map_err(|e| {
            ConfigurationLoadError::Invalid(format!(
                "auth_configuration.sts_server_identity_url is not a valid URL: {e}"
            ))
        })?;
        if !matches!(authority.scheme(), "http" | "https") {
            return Err(ConfigurationLoadError::Invalid(format!(
                "auth_configuration.sts_server_identity_url must be http(s), got '{}'",
                authority.scheme()
            )));
        }
        if let Some(endpoint) = &self.introspection_endpoint {
            Url::parse(endpoint).map_err(|e| {
                ConfigurationLoadError::Invalid(format!(
                    "auth_configuration.introspection_endpoint is not a valid URL: {e}"
                ))
            })?;
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigurationLoadError::Invalid(
                "auth_configuration.client_id must not be empty".to_string(),
            ));
        }
        if self.name_claim_type.trim().is_empty() {
            return Err(ConfigurationLoadError::Invalid(
                "auth_configuration.name_claim_type must not be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigurationLoadError::Invalid(
                "auth_configuration.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Secret part of the authority configuration (`auth_secrets_configuration` section)
#[derive(Debug, Deserialize, Clone)]
pub struct AuthSecretsConfiguration {
    /// Client secret presented to the introspection endpoint; redacted in `Debug`
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_secret: SecretString,
}

impl AuthSecretsConfiguration {
    pub(super) fn validate(&self) -> Result<(), ConfigurationLoadError> {
        if self.api_secret.expose_secret().is_empty() {
            return Err(ConfigurationLoadError::Invalid(
                "auth_secrets_configuration.api_secret must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}
