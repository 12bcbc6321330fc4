use super::types::ExecutionRecord;
use super::{insert_record, remove_record, ExecutionStore, StoreError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// In-process execution store. State lives as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ExecutionRecord>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a set of already-applied ids.
    pub fn with_executed<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut records: Vec<ExecutionRecord> = ids
            .into_iter()
            .map(|id| ExecutionRecord::new(id, None))
            .collect();
        records.sort_by(|a, b| a.migration_id.cmp(&b.migration_id));
        records.dedup_by(|a, b| a.migration_id == b.migration_id);

        Self {
            records: Mutex::new(records),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn executed(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
        self.check_available()?;
        Ok(self.records.lock().await.clone())
    }

    async fn log_migration(
        &self,
        id: &str,
        checksum: Option<&str>,
    ) -> Result<ExecutionRecord, StoreError> {
        self.check_available()?;
        let record = ExecutionRecord::new(id, checksum.map(str::to_string));
        insert_record(&mut *self.records.lock().await, record.clone())?;
        Ok(record)
    }

    async fn unlog_migration(&self, id: &str) -> Result<(), StoreError> {
        self.check_available()?;
        remove_record(&mut *self.records.lock().await, id)
    }
}
