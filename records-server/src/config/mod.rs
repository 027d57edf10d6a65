pub(crate) use crate::config::auth::{AuthConfiguration, AuthSecretsConfiguration};
pub(crate) use crate::config::logging::LoggingConfig;
pub(crate) use crate::config::security_headers::SecurityHeadersConfig;
pub(crate) use crate::config::static_files::StaticFilesConfig;
use config::{Config as ConfigCrate, ConfigError, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub mod auth;
pub mod logging;
pub mod security_headers;
pub mod static_files;

/// Mandatory base settings file
pub const BASE_SETTINGS_FILE: &str = "appsettings.json";

/// Environment variable selecting the active environment
pub const ENVIRONMENT_VARIABLE: &str = "RECORDS_ENVIRONMENT";

/// Environment used when `RECORDS_ENVIRONMENT` is not set
pub const DEFAULT_ENVIRONMENT: &str = "Production";

/// Environment name that enables development mode
pub const DEVELOPMENT_ENVIRONMENT: &str = "Development";

/// Prefix of environment variables that override settings keys
pub const ENV_PREFIX: &str = "RECORDS";

/// Separator used in environment variables for nested keys,
/// e.g. `RECORDS_AUTH_CONFIGURATION__STS_SERVER_IDENTITY_URL`
pub const ENV_NESTING_SEPARATOR: &str = "__";

/// Errors raised while building the configuration; all of them are fatal at startup
#[derive(Debug, Error)]
pub enum ConfigurationLoadError {
    #[error("Mandatory settings file not found: {0}")]
    MissingBaseFile(String),
    #[error("Failed to load configuration: {0}")]
    Source(#[from] ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Immutable, layered view over the base file, the environment overlay and
/// the process environment. Later sources win for the same key path.
#[derive(Debug, Clone)]
pub struct ConfigurationView {
    inner: ConfigCrate,
    environment: String,
}

impl ConfigurationView {
    /// Load `appsettings.json`, `appsettings.<environment>.json` and the
    /// `RECORDS_*` environment variables from `base_dir`.
    pub fn load(base_dir: &Path, environment: &str) -> Result<Self, ConfigurationLoadError> {
        Self::load_with_env(base_dir, environment, None)
    }

    /// Same as [`ConfigurationView::load`], reading environment overrides from
    /// `env` instead of the process environment when given.
    pub fn load_with_env(
        base_dir: &Path,
        environment: &str,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigurationLoadError> {
        let base_file = base_dir.join(BASE_SETTINGS_FILE);
        if !base_file.is_file() {
            return Err(ConfigurationLoadError::MissingBaseFile(
                base_file.display().to_string(),
            ));
        }
        let overlay_file = base_dir.join(format!("appsettings.{environment}.json"));

        let inner = ConfigCrate::builder()
            .add_source(File::from(base_file).format(FileFormat::Json).required(true))
            .add_source(
                File::from(overlay_file)
                    .format(FileFormat::Json)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator(ENV_NESTING_SEPARATOR)
                    .source(env),
            )
            .build()?;

        Ok(Self {
            inner,
            environment: environment.to_string(),
        })
    }

    /// Name of the environment this view was loaded for
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Whether the development environment is active
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case(DEVELOPMENT_ENVIRONMENT)
    }

    /// Look up a single value by its dotted key path
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.inner.get_string(key).ok()
    }

    /// Deserialize the section at `key` into a typed configuration struct
    pub fn section<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigurationLoadError> {
        Ok(self.inner.get::<T>(key)?)
    }

    /// Deserialize the whole view into [`Settings`] and validate it
    pub fn settings(&self) -> Result<Settings, ConfigurationLoadError> {
        let mut settings: Settings = self.inner.clone().try_deserialize()?;
        settings.development = self.is_development();
        settings.validate()?;
        Ok(settings)
    }
}

/// Connection strings section
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConnectionStrings {
    /// Connection string of the data event record store
    #[serde(default)]
    pub default_connection: String,
}

/// Main configuration structure for the records server
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// The port the server will listen to (default: 5000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// The only port same-host redirects may target over HTTPS (default: 44348)
    #[serde(default = "default_https_port")]
    pub https_port: u16,

    /// Set from the active environment, never read from files
    #[serde(skip)]
    pub development: bool,

    #[serde(default)]
    pub connection_strings: ConnectionStrings,

    pub auth_configuration: AuthConfiguration,

    pub auth_secrets_configuration: AuthSecretsConfiguration,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub static_files: StaticFilesConfig,

    #[serde(default)]
    pub security_headers: SecurityHeadersConfig,
}

fn default_port() -> u16 {
    5000
}

fn default_https_port() -> u16 {
    44348
}

impl Settings {
    fn validate(&self) -> Result<(), ConfigurationLoadError> {
        if self.connection_strings.default_connection.trim().is_empty() {
            return Err(ConfigurationLoadError::Invalid(
                "connection_strings.default_connection must be set".to_string(),
            ));
        }
        self.auth_configuration.validate()?;
        self.auth_secrets_configuration.validate()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn for_test_with_authority(authority: &wiremock::MockServer, static_root: &Path) -> Self {
        use secrecy::SecretString;

        Self {
            port: 0, // Let the OS choose a port
            https_port: 44348,
            development: false,
            connection_strings: ConnectionStrings {
                default_connection: "Data Source=:memory:".to_string(),
            },
            auth_configuration: AuthConfiguration {
                sts_server_identity_url: authority.uri(),
                client_id: "DataEventRecordsApi".to_string(),
                name_claim_type: "email".to_string(),
                introspection_endpoint: None,
                timeout_secs: 2,
                cache_ttl_secs: 0,
            },
            auth_secrets_configuration: AuthSecretsConfiguration {
                api_secret: SecretString::from("test-api-secret"),
            },
            logging: LoggingConfig::default(),
            static_files: StaticFilesConfig {
                root: static_root.display().to_string(),
                ..Default::default()
            },
            security_headers: SecurityHeadersConfig::default(),
        }
    }
}

/// Resolve the active environment name from the process environment
pub fn active_environment() -> String {
    std::env::var(ENVIRONMENT_VARIABLE)
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}
