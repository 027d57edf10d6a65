//! OAuth 2.0 token introspection client (RFC 7662)

use super::cache::IntrospectionCache;
use super::ClaimsPrincipal;
use crate::config::{AuthConfiguration, AuthSecretsConfiguration};
use http::StatusCode;
use log::{debug, warn};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::OnceCell;

/// Path of the authority's metadata document, relative to the authority URL
pub const DISCOVERY_PATH: &str = ".well-known/openid-configuration";

/// Errors that can occur while introspecting a token. None of the variants
/// carry the client secret or the token.
#[derive(Debug, Error)]
pub enum IntrospectionError {
    #[error("Failed to reach the authority: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Authority responded with status: {0}")]
    InvalidStatus(StatusCode),
    #[error("Failed to parse authority response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Authority metadata has no introspection endpoint")]
    MissingEndpoint,
}

/// Result of introspecting a token
#[derive(Debug, Clone, PartialEq)]
pub enum Introspection {
    Active(ClaimsPrincipal),
    Inactive,
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    introspection_endpoint: Option<String>,
}

/// Validates bearer tokens against the authority's introspection endpoint
/// using the configured client credentials
pub struct IntrospectionClient {
    http: Client,
    authority: String,
    client_id: String,
    client_secret: SecretString,
    name_claim_type: String,
    endpoint: OnceCell<String>,
    cache: Option<IntrospectionCache>,
}

impl IntrospectionClient {
    pub fn new(
        http: Client,
        auth: &AuthConfiguration,
        secrets: &AuthSecretsConfiguration,
    ) -> Self {
        let endpoint = match &auth.introspection_endpoint {
            Some(endpoint) => OnceCell::new_with(Some(endpoint.clone())),
            None => OnceCell::new(),
        };
        let cache = (auth.cache_ttl_secs > 0).then(|| IntrospectionCache::new(auth.cache_ttl_secs));

        Self {
            http,
            authority: auth.authority().to_string(),
            client_id: auth.client_id.clone(),
            client_secret: secrets.api_secret.clone(),
            name_claim_type: auth.name_claim_type.clone(),
            endpoint,
            cache,
        }
    }

    /// Build the HTTP client used to talk to the authority
    pub fn http_client(timeout_secs: u64) -> reqwest::Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.clamp(1, 2)))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
    }

    /// URL of the authority's metadata document
    pub fn discovery_url(&self) -> String {
        format!("{}/{}", self.authority, DISCOVERY_PATH)
    }

    /// Resolve the introspection endpoint, fetching the metadata document on
    /// first use. A failed lookup is retried on the next request.
    async fn endpoint(&self) -> Result<&str, IntrospectionError> {
        let endpoint = self
            .endpoint
            .get_or_try_init(|| async {
                let url = self.discovery_url();
                debug!("Fetching authority metadata from {}", url);
                let response = self.http.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(IntrospectionError::InvalidStatus(response.status()));
                }
                let body = response.bytes().await?;
                let document: DiscoveryDocument = serde_json::from_slice(&body)?;
                let endpoint = document
                    .introspection_endpoint
                    .ok_or(IntrospectionError::MissingEndpoint)?;
                Ok::<String, IntrospectionError>(endpoint)
            })
            .await?;
        Ok(endpoint.as_str())
    }

    /// Introspect `token`, answering from the cache when possible
    pub async fn introspect(&self, token: &str) -> Result<Introspection, IntrospectionError> {
        if let Some(cache) = &self.cache {
            if let Some(principal) = cache.get(token).await {
                debug!("Introspection cache hit");
                return Ok(Introspection::Active(principal));
            }
        }

        let endpoint = self.endpoint().await?;
        let response = self
            .http
            .post(endpoint)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(&[("token", token), ("token_type_hint", "access_token")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!("Introspection endpoint responded with status {}", status);
            return Err(IntrospectionError::InvalidStatus(status));
        }

        let body = response.bytes().await?;
        let fields: Map<String, Value> = serde_json::from_slice(&body)?;

        if !fields.get("active").and_then(Value::as_bool).unwrap_or(false) {
            debug!("Token is not active");
            return Ok(Introspection::Inactive);
        }

        let principal = ClaimsPrincipal::from_introspection(&fields, &self.name_claim_type);
        if let Some(cache) = &self.cache {
            cache
                .insert(token, principal.clone(), remaining_lifetime(&fields))
                .await;
        }
        Ok(Introspection::Active(principal))
    }
}

/// Time left until the `exp` claim, if the response carries one
fn remaining_lifetime(fields: &Map<String, Value>) -> Option<Duration> {
    let exp = fields.get("exp").and_then(Value::as_u64)?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(Duration::from_secs(exp.saturating_sub(now)))
}
