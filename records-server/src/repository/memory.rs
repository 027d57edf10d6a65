use super::{DataEventRecord, DataEventRecordInput, DataEventRecordRepository, RepositoryError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Records {
    next_id: i64,
    by_id: BTreeMap<i64, DataEventRecord>,
}

/// Process-local record store; contents are lost on restart
#[derive(Default)]
pub struct InMemoryRepository {
    records: RwLock<Records>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataEventRecordRepository for InMemoryRepository {
    async fn get_all(&self) -> Result<Vec<DataEventRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.by_id.values().cloned().collect())
    }

    async fn get(&self, id: i64) -> Result<DataEventRecord, RepositoryError> {
        let records = self.records.read().await;
        records
            .by_id
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn create(&self, input: DataEventRecordInput) -> Result<DataEventRecord, RepositoryError> {
        input.validate()?;
        let mut records = self.records.write().await;
        records.next_id += 1;
        let record = DataEventRecord {
            id: records.next_id,
            name: input.name,
            description: input.description,
            timestamp: input.timestamp.unwrap_or_else(Utc::now),
        };
        records.by_id.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: i64,
        input: DataEventRecordInput,
    ) -> Result<DataEventRecord, RepositoryError> {
        input.validate()?;
        let mut records = self.records.write().await;
        let record = records
            .by_id
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;
        record.name = input.name;
        record.description = input.description;
        record.timestamp = input.timestamp.unwrap_or_else(Utc::now);
        Ok(record.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records
            .by_id
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(id))
    }
}
