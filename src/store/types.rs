use serde::{Deserialize, Serialize};

/// Persisted marker that a migration unit has been applied
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub migration_id: String,
    pub executed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl ExecutionRecord {
    pub fn new(migration_id: impl Into<String>, checksum: Option<String>) -> Self {
        Self {
            migration_id: migration_id.into(),
            executed_at: crate::utils::now_iso(),
            checksum,
        }
    }
}

/// The execution state file (default `.migrate/state.json`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateFile {
    /// Schema version for future format changes
    pub schema_version: u32,

    /// When the state was last modified
    pub updated_at: String,

    /// Applied migrations, kept sorted by id
    #[serde(default)]
    pub migrations: Vec<ExecutionRecord>,
}

impl StateFile {
    pub fn new() -> Self {
        Self {
            schema_version: 1,
            updated_at: crate::utils::now_iso(),
            migrations: Vec::new(),
        }
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}
