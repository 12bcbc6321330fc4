use super::types::{ExecutionRecord, StateFile};
use super::{insert_record, remove_record, ExecutionStore, StoreError};
use crate::utils::now_iso;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Global mutex for state file read-modify-write cycles
static STATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn get_lock() -> &'static Mutex<()> {
    STATE_LOCK.get_or_init(|| Mutex::new(()))
}

/// Execution store backed by a JSON state file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state from disk. A missing file is an empty state.
    ///
    /// A hand-edited file that lists one id twice is rejected.
    pub async fn read_state(&self) -> Result<StateFile, StoreError> {
        if !self.path.exists() {
            return Ok(StateFile::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let mut state: StateFile = serde_json::from_str(&content)?;
        state
            .migrations
            .sort_by(|a, b| a.migration_id.cmp(&b.migration_id));
        if let Some(pair) = state
            .migrations
            .windows(2)
            .find(|pair| pair[0].migration_id == pair[1].migration_id)
        {
            return Err(StoreError::DuplicateRecord(pair[0].migration_id.clone()));
        }
        Ok(state)
    }

    /// Write the state to disk without acquiring the lock (caller must hold lock)
    async fn write_state_unlocked(&self, state: &StateFile) -> Result<(), StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write atomically using temp file + rename
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for JsonFileStore {
    async fn executed(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
        Ok(self.read_state().await?.migrations)
    }

    async fn log_migration(
        &self,
        id: &str,
        checksum: Option<&str>,
    ) -> Result<ExecutionRecord, StoreError> {
        let _guard = get_lock().lock().await;

        let mut state = self.read_state().await?;
        let record = ExecutionRecord::new(id, checksum.map(str::to_string));
        insert_record(&mut state.migrations, record.clone())?;

        state.updated_at = now_iso();
        self.write_state_unlocked(&state).await?;
        debug!(id = %id, path = %self.path.display(), "Logged migration");

        Ok(record)
    }

    async fn unlog_migration(&self, id: &str) -> Result<(), StoreError> {
        let _guard = get_lock().lock().await;

        let mut state = self.read_state().await?;
        remove_record(&mut state.migrations, id)?;

        state.updated_at = now_iso();
        self.write_state_unlocked(&state).await?;
        debug!(id = %id, path = %self.path.display(), "Unlogged migration");

        Ok(())
    }
}
