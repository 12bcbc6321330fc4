//! Persistence of which migration units have been applied.
//!
//! [`ExecutionStore`] is the capability the migrator needs. Any backend
//! that can list, insert and remove records by id can implement it.

mod file;
mod memory;
mod types;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use types::{ExecutionRecord, StateFile};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Migration already logged as executed: {0}")]
    AlreadyLogged(String),

    #[error("Migration not logged as executed: {0}")]
    NotLogged(String),

    #[error("State file records {0} more than once")]
    DuplicateRecord(String),

    #[error("Execution store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Applied records, ascending by migration id.
    async fn executed(&self) -> Result<Vec<ExecutionRecord>, StoreError>;

    /// Record `id` as applied. Fails with `AlreadyLogged` if present.
    async fn log_migration(
        &self,
        id: &str,
        checksum: Option<&str>,
    ) -> Result<ExecutionRecord, StoreError>;

    /// Remove the record for `id`. Fails with `NotLogged` if absent.
    async fn unlog_migration(&self, id: &str) -> Result<(), StoreError>;
}

/// Insert a record keeping id order. Shared by the store backends.
pub(crate) fn insert_record(
    records: &mut Vec<ExecutionRecord>,
    record: ExecutionRecord,
) -> Result<(), StoreError> {
    match records.binary_search_by(|r| r.migration_id.as_str().cmp(&record.migration_id)) {
        Ok(_) => Err(StoreError::AlreadyLogged(record.migration_id)),
        Err(pos) => {
            records.insert(pos, record);
            Ok(())
        }
    }
}

/// Remove a record by id. Shared by the store backends.
pub(crate) fn remove_record(records: &mut Vec<ExecutionRecord>, id: &str) -> Result<(), StoreError> {
    match records.binary_search_by(|r| r.migration_id.as_str().cmp(id)) {
        Ok(pos) => {
            records.remove(pos);
            Ok(())
        }
        Err(_) => Err(StoreError::NotLogged(id.to_string())),
    }
}
