use crate::errors::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

pub mod memory;

/// A data event record as exposed by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataEventRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Fields a client may set when creating or replacing a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataEventRecordInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to the time the record is stored
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl DataEventRecordInput {
    pub fn validate(&self) -> Result<(), RepositoryError> {
        if self.name.trim().is_empty() {
            return Err(RepositoryError::Invalid("name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Errors that can occur during repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Data event record {0} not found")]
    NotFound(i64),
    #[error("Invalid data event record: {0}")]
    Invalid(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => ApiError::not_found(err.to_string()),
            RepositoryError::Invalid(_) => ApiError::bad_request(err.to_string()),
            RepositoryError::Storage(_) => ApiError::internal(err.to_string()),
        }
    }
}

/// Storage of data event records.
///
/// Implementations must be safe to share between concurrent requests and
/// must not hold locks across await points of their callers.
#[async_trait]
pub trait DataEventRecordRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<DataEventRecord>, RepositoryError>;

    async fn get(&self, id: i64) -> Result<DataEventRecord, RepositoryError>;

    async fn create(&self, input: DataEventRecordInput) -> Result<DataEventRecord, RepositoryError>;

    async fn update(
        &self,
        id: i64,
        input: DataEventRecordInput,
    ) -> Result<DataEventRecord, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;
}

/// Extract the `Data Source` entry of a connection string, the only part
/// that is safe to log
pub fn data_source(connection_string: &str) -> Option<&str> {
    connection_string.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("data source")
            .then(|| value.trim())
    })
}

const IN_MEMORY_DATA_SOURCE: &str = ":memory:";

/// Whether `connection_string` names a durable store the in-memory repository
/// cannot honour
pub fn expects_durable_store(connection_string: &str) -> bool {
    data_source(connection_string).is_some_and(|source| source != IN_MEMORY_DATA_SOURCE)
}

/// Create the repository bound to `connection_string`
pub fn create_repository(connection_string: &str) -> Arc<dyn DataEventRecordRepository> {
    let source = data_source(connection_string).unwrap_or("unspecified");
    if expects_durable_store(connection_string) {
        warn!(
            "Data source '{}' is served by the in-memory store; records are lost on restart",
            source
        );
    } else {
        info!("Using in-memory data event record store (data source: {})", source);
    }
    Arc::new(memory::InMemoryRepository::new())
}
