#![allow(dead_code)]

use async_trait::async_trait;
use migrate_runner::{Migration, MigrationRegistry, UnitExecutionError};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::fs;

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Shared log of `"<direction>:<id>"` entries
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// In-memory unit that records every call and can be told to fail
pub struct RecordingMigration {
    id: String,
    log: CallLog,
    fail_up: bool,
    fail_down: bool,
}

impl RecordingMigration {
    pub fn new(id: &str, log: &CallLog) -> Self {
        Self {
            id: id.to_string(),
            log: Arc::clone(log),
            fail_up: false,
            fail_down: false,
        }
    }

    pub fn failing_up(mut self) -> Self {
        self.fail_up = true;
        self
    }

    pub fn failing_down(mut self) -> Self {
        self.fail_down = true;
        self
    }
}

#[async_trait]
impl Migration for RecordingMigration {
    fn id(&self) -> &str {
        &self.id
    }

    async fn up(&self) -> Result<(), UnitExecutionError> {
        self.log.lock().unwrap().push(format!("up:{}", self.id));
        if self.fail_up {
            return Err(UnitExecutionError::Failed(format!("{} up exploded", self.id)));
        }
        Ok(())
    }

    async fn down(&self) -> Result<(), UnitExecutionError> {
        self.log.lock().unwrap().push(format!("down:{}", self.id));
        if self.fail_down {
            return Err(UnitExecutionError::Failed(format!("{} down exploded", self.id)));
        }
        Ok(())
    }
}

/// Registry of succeeding recording units
pub fn registry_of(ids: &[&str], log: &CallLog) -> MigrationRegistry {
    let mut registry = MigrationRegistry::new();
    for id in ids {
        registry.register(Arc::new(RecordingMigration::new(id, log)));
    }
    registry
}

/// Write a JSON unit file into a migrations directory
pub async fn write_unit(migrations_dir: &Path, id: &str, up: &[&str], down: &[&str]) {
    fs::create_dir_all(migrations_dir)
        .await
        .expect("Should create migrations dir");
    let body = serde_json::json!({
        "description": format!("unit {}", id),
        "up": up,
        "down": down,
    });
    fs::write(
        migrations_dir.join(format!("{}.json", id)),
        serde_json::to_string_pretty(&body).unwrap(),
    )
    .await
    .expect("Should write unit");
}
